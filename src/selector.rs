//! Greedy first-fit box selection.
//!
//! Products and boxes are both sorted by ascending volume. Each product goes
//! into the first box whose remaining capacity passes the fit predicate, and
//! that box's remaining volume and weight limit shrink accordingly. When no
//! box fits, the box at [`FALLBACK_BOX_INDEX`] is retried once; if that fails
//! too, the product is left out and reported as an error string.
//!
//! The heuristic is deterministic and not optimal: no rotation, no splitting
//! and no rebalancing once a product has been placed.

use std::cmp::Ordering;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::BoxCatalog;
use crate::fit::{UnplacedReason, can_fit_in_box, check_fit};
use crate::grouping::{GroupedAllocation, group_products_in_a_box};
use crate::model::{Product, ShippingBox};
use crate::types::EntityId;

/// Position of the fallback box in the volume-sorted box list.
///
/// This is a fixed slot, not the largest remaining box. With the standard
/// five-box catalog it is the largest box.
pub const FALLBACK_BOX_INDEX: usize = 4;

/// Errors that abort a selection run. Placement failures are not errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    #[error(
        "box catalog holds {available} boxes but the fallback box is expected at index {index}"
    )]
    CatalogTooSmall { index: usize, available: usize },
}

/// A product that could not be stored in any box.
#[derive(Clone, Debug, PartialEq)]
pub struct UnplacedProduct {
    pub product: Product,
    /// First constraint the product violated against the fallback box.
    pub reason: UnplacedReason,
}

/// Outcome of a selection run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionResult {
    pub grouped_allocation: GroupedAllocation,
    /// One message per product that fits nowhere, in processing order.
    pub errors: Vec<String>,
    pub unplaced: Vec<UnplacedProduct>,
}

impl SelectionResult {
    /// Whether every product found a box.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn box_count(&self) -> usize {
        self.grouped_allocation.len()
    }

    pub fn placed_count(&self) -> usize {
        self.grouped_allocation.product_count()
    }

    pub fn unplaced_count(&self) -> usize {
        self.unplaced.len()
    }
}

/// Steps reported while selecting, for live progress output.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectionEvent {
    /// A product was stored in a box.
    ProductAssigned {
        product_id: EntityId,
        box_id: EntityId,
        remaining_volume: f64,
        remaining_weight: f64,
        via_fallback: bool,
    },
    /// A product fits nowhere.
    ProductRejected {
        product_id: EntityId,
        reason_code: String,
        message: String,
    },
    /// Selection finished.
    Finished { boxes_used: usize, unplaced: usize },
}

/// Message reported for a product that fits in no box.
pub fn placement_error_message(product: &Product) -> String {
    format!(
        "Product {} with dimensions {}x{}x{} and weight {}kg does not fit in the largest available box.",
        product.name,
        format_number(product.length),
        format_number(product.width),
        format_number(product.height),
        format_number(product.weight)
    )
}

/// Renders a number the way the web client does: plain decimals between
/// 1e-6 and 1e21, exponent notation with an explicit sign outside that range.
fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return value.to_string();
    }
    let formatted = format!("{value:e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => formatted,
    }
}

/// Selects boxes for `products` from the built-in catalog.
///
/// # Examples
/// ```
/// use box_allocator::model::Product;
/// use box_allocator::selector::select_box;
///
/// let result = select_box(vec![Product::new(1, "Mug", 10.0, 10.0, 10.0, 0.4)]).unwrap();
/// assert_eq!(result.box_count(), 1);
/// assert!(result.errors.is_empty());
/// ```
pub fn select_box(products: Vec<Product>) -> Result<SelectionResult, SelectionError> {
    select_box_with_catalog(&BoxCatalog::builtin(), products)
}

/// Selects boxes for `products` from the given catalog.
pub fn select_box_with_catalog(
    catalog: &BoxCatalog,
    products: Vec<Product>,
) -> Result<SelectionResult, SelectionError> {
    select_box_with_progress(catalog, products, |_| {})
}

/// Selects boxes and reports every step to `on_event`.
pub fn select_box_with_progress(
    catalog: &BoxCatalog,
    products: Vec<Product>,
    on_event: impl FnMut(&SelectionEvent),
) -> Result<SelectionResult, SelectionError> {
    allocate(catalog.get_boxes(), products, on_event)
}

/// Total order on volumes. NaN sorts after every number, so unvalidated
/// input cannot break the sort.
fn by_volume(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}

/// Runs the greedy pass over a fresh set of boxes.
///
/// `boxes` is the per-run arena whose capacity gets consumed; it is dropped
/// once the grouping has captured the final remaining capacity.
fn allocate(
    mut boxes: Vec<ShippingBox>,
    mut products: Vec<Product>,
    mut on_event: impl FnMut(&SelectionEvent),
) -> Result<SelectionResult, SelectionError> {
    if boxes.len() <= FALLBACK_BOX_INDEX {
        return Err(SelectionError::CatalogTooSmall {
            index: FALLBACK_BOX_INDEX,
            available: boxes.len(),
        });
    }

    // Both sorts are stable, so equal volumes keep their input order.
    products.sort_by(|a, b| by_volume(a.volume, b.volume));
    boxes.sort_by(|a, b| by_volume(a.volume, b.volume));

    let mut allocation: Vec<(Product, usize)> = Vec::with_capacity(products.len());
    let mut errors: Vec<String> = Vec::new();
    let mut unplaced: Vec<UnplacedProduct> = Vec::new();

    for product in products {
        let first_fit = boxes.iter().position(|b| can_fit_in_box(&product, b));

        let target = match first_fit {
            Some(index) => Ok((index, false)),
            None => check_fit(&product, &boxes[FALLBACK_BOX_INDEX])
                .map(|()| (FALLBACK_BOX_INDEX, true)),
        };

        match target {
            Ok((index, via_fallback)) => {
                let shipping_box = &mut boxes[index];
                shipping_box.store(&product);
                debug!(
                    product_id = product.id,
                    box_id = shipping_box.id,
                    remaining_volume = shipping_box.volume,
                    remaining_weight = shipping_box.weight_limit,
                    via_fallback,
                    "product assigned"
                );
                on_event(&SelectionEvent::ProductAssigned {
                    product_id: product.id,
                    box_id: shipping_box.id,
                    remaining_volume: shipping_box.volume,
                    remaining_weight: shipping_box.weight_limit,
                    via_fallback,
                });
                allocation.push((product, index));
            }
            Err(reason) => {
                let message = placement_error_message(&product);
                warn!(product_id = product.id, reason = reason.code(), "{message}");
                on_event(&SelectionEvent::ProductRejected {
                    product_id: product.id,
                    reason_code: reason.code().to_string(),
                    message: message.clone(),
                });
                errors.push(message);
                unplaced.push(UnplacedProduct { product, reason });
            }
        }
    }

    let grouped_allocation =
        group_products_in_a_box(allocation.iter().map(|(product, index)| (product, &boxes[*index])));

    on_event(&SelectionEvent::Finished {
        boxes_used: grouped_allocation.len(),
        unplaced: unplaced.len(),
    });

    Ok(SelectionResult {
        grouped_allocation,
        errors,
        unplaced,
    })
}
