// src/main.rs
use std::process::ExitCode;

use box_allocator::api::{self, ApiState};
use box_allocator::config::AppConfig;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "box_allocator=info,tower_http=info";

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv_result = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();

    let boxes = match app_config.catalog.load_boxes() {
        Ok(boxes) => boxes,
        Err(err) => {
            error!("❌ Box catalog could not be loaded: {err}");
            return ExitCode::FAILURE;
        }
    };
    let products = match app_config.catalog.load_products() {
        Ok(products) => products,
        Err(err) => {
            error!("❌ Product catalog could not be loaded: {err}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "🚀 Box allocation service starting ({} box types, {} catalog products, max {} products per request)",
        boxes.len(),
        products.len(),
        app_config.limits.max_products
    );
    let state = ApiState::new(boxes, products, app_config.limits);

    match api::start_api_server(app_config.api, state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("❌ API server terminated with an error: {err}");
            ExitCode::FAILURE
        }
    }
}
