//! REST API for the box allocation service.
//!
//! Validates incoming product lists the way the product selection form does
//! (no duplicates, limited quantity, sane measurements) and hands them to the
//! selector. Uses Axum as the web framework and supports CORS.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::catalog::{BoxCatalog, ProductCatalog};
use crate::config::{ApiConfig, RequestLimits};
use crate::model::{Product, ShippingBox, ValidationError};
use crate::selector::{
    SelectionError, SelectionResult, select_box_with_catalog, select_box_with_progress,
};
use crate::types::{Dimensional, EntityId};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    boxes: Arc<BoxCatalog>,
    products: Arc<ProductCatalog>,
    limits: RequestLimits,
}

impl ApiState {
    pub fn new(boxes: BoxCatalog, products: ProductCatalog, limits: RequestLimits) -> Self {
        Self {
            boxes: Arc::new(boxes),
            products: Arc::new(products),
            limits,
        }
    }
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes as published for swagger-ui-dist@5.17.14.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>box-allocator API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// A product as submitted by a client. Any volume sent along is ignored.
#[derive(Deserialize, Clone, ToSchema)]
pub struct ProductRequest {
    pub id: EntityId,
    pub name: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
}

impl ProductRequest {
    fn into_product(self) -> Product {
        Product::new(
            self.id,
            self.name,
            self.length,
            self.width,
            self.height,
            self.weight,
        )
    }
}

/// Request structure for the packing endpoints.
///
/// Products can be sent in full or picked from the product catalog by id.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "products": [
            { "id": 1, "name": "Product 1", "length": 10.0, "width": 20.0, "height": 10.0, "weight": 5.0 }
        ],
        "product_ids": [2, 10]
    })
)]
pub struct PackRequest {
    #[serde(default)]
    pub products: Vec<ProductRequest>,
    #[serde(default)]
    pub product_ids: Vec<EntityId>,
}

#[derive(Debug, PartialEq)]
enum PackRequestValidationError {
    MissingProducts,
    TooManyProducts { max: usize, got: usize },
    DuplicateProduct(EntityId),
    UnknownProduct(EntityId),
    InvalidProduct(ValidationError),
}

impl PackRequest {
    fn into_validated(
        self,
        catalog: &ProductCatalog,
        limits: &RequestLimits,
    ) -> Result<Vec<Product>, PackRequestValidationError> {
        let mut products: Vec<Product> = self
            .products
            .into_iter()
            .map(ProductRequest::into_product)
            .collect();

        for id in self.product_ids {
            let product = catalog
                .select(id)
                .ok_or(PackRequestValidationError::UnknownProduct(id))?;
            products.push(product);
        }

        if products.is_empty() {
            return Err(PackRequestValidationError::MissingProducts);
        }
        if products.len() > limits.max_products {
            return Err(PackRequestValidationError::TooManyProducts {
                max: limits.max_products,
                got: products.len(),
            });
        }
        if limits.reject_duplicates {
            let mut seen = HashSet::new();
            if let Some(duplicate) = products.iter().find(|product| !seen.insert(product.id)) {
                return Err(PackRequestValidationError::DuplicateProduct(duplicate.id));
            }
        }
        for product in &products {
            product
                .validate()
                .map_err(PackRequestValidationError::InvalidProduct)?;
        }

        Ok(products)
    }
}

/// Response with the selected boxes and any products that fit nowhere.
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub grouped_allocation: Vec<PackedBox>,
    /// One message per product that fits in no box.
    pub error: Vec<String>,
    pub unplaced: Vec<PackedUnplacedProduct>,
    pub is_complete: bool,
}

/// A selected box with its remaining capacity and assigned products.
#[derive(Serialize, ToSchema)]
pub struct PackedBox {
    pub id: EntityId,
    pub name: String,
    /// Name and width×height×length, e.g. `Small Box (15x10x20)`.
    pub label: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub remaining_volume: f64,
    pub remaining_weight: f64,
    pub products: Vec<Product>,
}

#[derive(Serialize, ToSchema)]
pub struct PackedUnplacedProduct {
    pub id: EntityId,
    pub name: String,
    pub reason_code: String,
    pub reason: String,
}

impl PackResponse {
    pub fn from_selection_result(result: SelectionResult) -> Self {
        let is_complete = result.is_complete();
        let SelectionResult {
            grouped_allocation,
            errors,
            unplaced,
        } = result;

        Self {
            grouped_allocation: grouped_allocation
                .into_iter()
                .map(|group| {
                    let label = group.shipping_box.label();
                    let ShippingBox {
                        id,
                        name,
                        length,
                        width,
                        height,
                        volume,
                        weight_limit,
                    } = group.shipping_box;
                    PackedBox {
                        id,
                        name,
                        label,
                        length,
                        width,
                        height,
                        remaining_volume: volume,
                        remaining_weight: weight_limit,
                        products: group.products,
                    }
                })
                .collect(),
            error: errors,
            unplaced: unplaced
                .into_iter()
                .map(|entry| PackedUnplacedProduct {
                    id: entry.product.id,
                    name: entry.product.name,
                    reason_code: entry.reason.code().to_string(),
                    reason: entry.reason.to_string(),
                })
                .collect(),
            is_complete,
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn catalog_error(err: SelectionError) -> Response {
    error!("Box catalog misconfigured: {err}");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Box catalog misconfigured",
        err.to_string(),
    )
}

fn parse_pack_request(
    state: &ApiState,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Result<Vec<Product>, Response> {
    let Json(payload) = payload.map_err(|err| {
        error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid JSON data",
            err.to_string(),
        )
    })?;

    payload
        .into_validated(&state.products, &state.limits)
        .map_err(|err| {
            warn!("Rejected pack request: {err:?}");
            match err {
                PackRequestValidationError::MissingProducts => {
                    validation_error("At least one product must be specified")
                }
                PackRequestValidationError::TooManyProducts { max, got } => validation_error(
                    format!("A maximum of {max} products can be allocated at once, got {got}"),
                ),
                PackRequestValidationError::DuplicateProduct(id) => {
                    validation_error(format!("Product {id} has already been added"))
                }
                PackRequestValidationError::UnknownProduct(id) => {
                    validation_error(format!("Product {id} is not in the product catalog"))
                }
                PackRequestValidationError::InvalidProduct(err) => {
                    validation_error(err.to_string())
                }
            }
        })
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream, list_boxes, list_products),
    components(
        schemas(
            PackRequest,
            ProductRequest,
            PackResponse,
            PackedBox,
            PackedUnplacedProduct,
            ErrorResponse,
            Product,
            ShippingBox
        )
    ),
    tags((name = "packing", description = "Endpoints for box allocation"))
)]
struct ApiDoc;

/// Builds the router with all endpoints.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/boxes", get(list_boxes))
        .route("/products", get(list_products))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server and blocks until it terminates.
pub async fn start_api_server(config: ApiConfig, state: ApiState) -> std::io::Result<()> {
    let app = router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("💡 Local access: http://localhost:{}", config.port());
    }
    info!("📦 API endpoints: POST /pack, POST /pack_stream, GET /boxes, GET /products");
    info!("📑 Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for POST /pack.
///
/// Allocates the submitted products into boxes from the catalog.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Products allocated (possibly with errors)", body = PackResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse),
        (status = INTERNAL_SERVER_ERROR, description = "Box catalog misconfigured", body = ErrorResponse)
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let products = match parse_pack_request(&state, payload) {
        Ok(products) => products,
        Err(response) => return response,
    };

    info!("📥 New pack request: {} products", products.len());
    let result = match select_box_with_catalog(&state.boxes, products) {
        Ok(result) => result,
        Err(err) => return catalog_error(err),
    };
    info!(
        "📦 Result: {} boxes, {} unplaced products",
        result.box_count(),
        result.unplaced_count()
    );

    (StatusCode::OK, Json(PackResponse::from_selection_result(result))).into_response()
}

/// Handler for POST /pack_stream (SSE).
///
/// Streams selection events as Server-Sent Events while products are assigned.
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams selection events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let products = match parse_pack_request(&state, payload) {
        Ok(products) => products,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);
    let boxes = Arc::clone(&state.boxes);

    tokio::task::spawn_blocking(move || {
        let outcome = select_box_with_progress(&boxes, products, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver means the client went away; drop the event.
                let _ = tx.blocking_send(json);
            }
        });
        if let Err(err) = outcome {
            error!("Box catalog misconfigured: {err}");
        }
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for GET /boxes. Lists the box catalog with computed volumes.
#[utoipa::path(
    get,
    path = "/boxes",
    responses((status = 200, description = "Available box types", body = [ShippingBox])),
    tag = "packing"
)]
async fn list_boxes(State(state): State<ApiState>) -> Json<Vec<ShippingBox>> {
    Json(state.boxes.get_boxes())
}

/// Handler for GET /products. Lists the product catalog sorted by name.
#[utoipa::path(
    get,
    path = "/products",
    responses((status = 200, description = "Selectable products", body = [Product])),
    tag = "packing"
)]
async fn list_products(State(state): State<ApiState>) -> Json<Vec<Product>> {
    Json(state.products.entries().to_vec())
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ApiState {
        ApiState::new(
            BoxCatalog::builtin(),
            ProductCatalog::builtin(),
            RequestLimits::default(),
        )
    }

    fn request(json: &str) -> PackRequest {
        serde_json::from_str(json).expect("Should parse valid JSON")
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        serde_json::from_slice(&bytes).expect("JSON body")
    }

    const SAMPLE_REQUEST: &str = r#"{
        "products": [
            {"id": 1, "name": "Product 1", "length": 10.0, "width": 20.0, "height": 10.0, "weight": 5.0},
            {"id": 3, "name": "Product 2", "length": 10.0, "width": 15.0, "height": 10.0, "weight": 7.0},
            {"id": 2, "name": "Product 3", "length": 40.0, "width": 60.0, "height": 50.0, "weight": 25.0}
        ]
    }"#;

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/pack", "/pack_stream", "/boxes", "/products"] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        for name in ["PackRequest", "PackResponse", "ErrorResponse", "Product"] {
            assert!(
                components.schemas.contains_key(name),
                "Expected schema '{}' is missing from OpenAPI spec",
                name
            );
        }
    }

    #[test]
    fn submitted_volume_is_recomputed() {
        let json = r#"{"products": [
            {"id": 1, "name": "Mug", "length": 10.0, "width": 8.0, "height": 12.0, "weight": 0.4, "volume": 1.0}
        ]}"#;
        let products = request(json)
            .into_validated(&ProductCatalog::builtin(), &RequestLimits::default())
            .expect("valid request");
        assert_eq!(products[0].volume, 960.0);
    }

    #[test]
    fn catalog_ids_are_resolved() {
        let products = request(r#"{"product_ids": [2, 10]}"#)
            .into_validated(&ProductCatalog::builtin(), &RequestLimits::default())
            .expect("valid request");
        let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Laptop", "Hardcover Book"]);
        assert_eq!(products[0].volume, 36.0 * 25.0 * 3.0);
    }

    #[test]
    fn unknown_catalog_id_is_rejected() {
        let err = request(r#"{"product_ids": [99]}"#)
            .into_validated(&ProductCatalog::builtin(), &RequestLimits::default())
            .unwrap_err();
        assert_eq!(err, PackRequestValidationError::UnknownProduct(99));
    }

    #[test]
    fn empty_request_is_rejected() {
        let err = request("{}")
            .into_validated(&ProductCatalog::builtin(), &RequestLimits::default())
            .unwrap_err();
        assert_eq!(err, PackRequestValidationError::MissingProducts);
    }

    #[test]
    fn duplicates_are_rejected_unless_allowed() {
        let json = r#"{"products": [
            {"id": 5, "name": "A", "length": 1.0, "width": 1.0, "height": 1.0, "weight": 1.0}
        ], "product_ids": [5]}"#;

        let err = request(json)
            .into_validated(&ProductCatalog::builtin(), &RequestLimits::default())
            .unwrap_err();
        assert_eq!(err, PackRequestValidationError::DuplicateProduct(5));

        let relaxed = RequestLimits {
            reject_duplicates: false,
            ..RequestLimits::default()
        };
        let products = request(json)
            .into_validated(&ProductCatalog::builtin(), &relaxed)
            .expect("duplicates allowed");
        assert_eq!(products.len(), 2);
    }

    #[test]
    fn product_limit_is_enforced() {
        let ids: Vec<String> = (1..=10).map(|id| id.to_string()).collect();
        let json = format!(
            r#"{{"product_ids": [{}], "products": [
                {{"id": 11, "name": "Extra", "length": 1.0, "width": 1.0, "height": 1.0, "weight": 1.0}}
            ]}}"#,
            ids.join(",")
        );
        let err = request(&json)
            .into_validated(&ProductCatalog::builtin(), &RequestLimits::default())
            .unwrap_err();
        assert_eq!(
            err,
            PackRequestValidationError::TooManyProducts { max: 10, got: 11 }
        );
    }

    #[test]
    fn invalid_measurements_are_rejected() {
        let json = r#"{"products": [
            {"id": 1, "name": "Flat", "length": 10.0, "width": 0.0, "height": 1.0, "weight": 1.0}
        ]}"#;
        let err = request(json)
            .into_validated(&ProductCatalog::builtin(), &RequestLimits::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PackRequestValidationError::InvalidProduct(ValidationError::InvalidDimension(_))
        ));
    }

    #[tokio::test]
    async fn pack_endpoint_reports_grouping_and_errors() {
        let response = handle_pack(State(state()), Ok(Json(request(SAMPLE_REQUEST)))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let groups = body["grouped_allocation"].as_array().expect("array");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["name"], "Small Box");
        assert_eq!(groups[0]["label"], "Small Box (15x10x20)");
        assert_eq!(groups[0]["remaining_weight"], 3.0);
        assert_eq!(groups[0]["products"][0]["name"], "Product 2");
        assert_eq!(groups[1]["name"], "Medium Box");

        assert_eq!(
            body["error"],
            json!([
                "Product Product 3 with dimensions 40x60x50 and weight 25kg does not fit in the largest available box."
            ])
        );
        assert_eq!(body["unplaced"][0]["reason_code"], "dimensions_exceed_box");
        assert_eq!(body["is_complete"], false);
    }

    #[tokio::test]
    async fn pack_stream_emits_events_in_order() {
        let response =
            handle_pack_stream(State(state()), Ok(Json(request(SAMPLE_REQUEST)))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body = String::from_utf8(bytes.to_vec()).expect("UTF-8 body");
        let events: Vec<serde_json::Value> = body
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| serde_json::from_str(data.trim()).expect("JSON event"))
            .collect();

        assert_eq!(events.len(), 4);
        assert_eq!(events[0]["type"], "product_assigned");
        assert_eq!(events[0]["product_id"], 3);
        assert_eq!(events[0]["box_id"], 1);
        assert_eq!(events[1]["type"], "product_assigned");
        assert_eq!(events[1]["product_id"], 1);
        assert_eq!(events[2]["type"], "product_rejected");
        assert_eq!(events[2]["reason_code"], "dimensions_exceed_box");
        assert_eq!(events[3]["type"], "finished");
        assert_eq!(events[3]["boxes_used"], 2);
        assert_eq!(events[3]["unplaced"], 1);
    }

    #[tokio::test]
    async fn pack_stream_rejects_invalid_input() {
        let response =
            handle_pack_stream(State(state()), Ok(Json(request(r#"{"products": []}"#)))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn pack_endpoint_returns_empty_error_list_when_complete() {
        let json = r#"{"product_ids": [1]}"#;
        let response = handle_pack(State(state()), Ok(Json(request(json)))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["error"], json!([]));
        assert_eq!(body["is_complete"], true);
    }

    #[tokio::test]
    async fn pack_endpoint_rejects_invalid_input() {
        let response = handle_pack(State(state()), Ok(Json(request("{}")))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid input data");
    }

    #[tokio::test]
    async fn box_listing_shows_full_capacity() {
        let Json(boxes) = list_boxes(State(state())).await;
        assert_eq!(boxes.len(), 5);
        assert_eq!(boxes[4].volume, 120_000.0);
        assert_eq!(boxes[4].weight_limit, 30.0);
    }

    #[tokio::test]
    async fn product_listing_is_sorted() {
        let Json(products) = list_products(State(state())).await;
        assert_eq!(products.len(), 10);
        assert_eq!(products[0].name, "Blender");
    }
}
