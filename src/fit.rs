//! Fit predicate between a product and a box's remaining capacity.

use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{Product, ShippingBox};
use crate::types::Dimensional;

/// Reasons why a product could not be stored in a box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnplacedReason {
    TooHeavyForBox,
    DimensionsExceedBox,
    InsufficientVolume,
}

impl UnplacedReason {
    pub fn code(&self) -> &'static str {
        match self {
            UnplacedReason::TooHeavyForBox => "too_heavy_for_box",
            UnplacedReason::DimensionsExceedBox => "dimensions_exceed_box",
            UnplacedReason::InsufficientVolume => "insufficient_volume",
        }
    }
}

impl fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnplacedReason::TooHeavyForBox => {
                write!(f, "Product exceeds the remaining weight limit of the box")
            }
            UnplacedReason::DimensionsExceedBox => {
                write!(f, "Product exceeds the box in at least one dimension")
            }
            UnplacedReason::InsufficientVolume => {
                write!(f, "Not enough volume left in the box")
            }
        }
    }
}

/// Returns `true` iff the product fits the box's remaining capacity.
///
/// All five conditions must hold: remaining volume, width, height, length
/// and remaining weight limit are each at least the product's value.
/// Comparisons are exact and positional.
pub fn can_fit_in_box(product: &Product, shipping_box: &ShippingBox) -> bool {
    shipping_box.volume >= product.volume
        && shipping_box.width >= product.width
        && shipping_box.height >= product.height
        && shipping_box.length >= product.length
        && shipping_box.weight_limit >= product.weight
}

// NaN on either side counts as not fitting.
#[inline]
fn at_least(capacity: f64, required: f64) -> bool {
    capacity >= required
}

/// Like [`can_fit_in_box`], but names the first violated constraint.
///
/// Constraints are checked in the order weight, dimensions, volume.
pub fn check_fit(product: &Product, shipping_box: &ShippingBox) -> Result<(), UnplacedReason> {
    if !at_least(shipping_box.weight_limit, product.weight) {
        return Err(UnplacedReason::TooHeavyForBox);
    }
    if !product.dimensions().fits_within(&shipping_box.dimensions()) {
        return Err(UnplacedReason::DimensionsExceedBox);
    }
    if !at_least(shipping_box.volume, product.volume) {
        return Err(UnplacedReason::InsufficientVolume);
    }
    Ok(())
}
