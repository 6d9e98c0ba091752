//! Data models for box allocation.
//!
//! - `Product`: an item a customer wants shipped
//! - `ShippingBox`: a box type whose `volume` and `weight_limit` track the
//!   remaining capacity during one allocation run
//!
//! The allocation core never validates these values. Validation helpers live
//! here so the request boundary can reject bad input before it reaches the
//! core.

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{Dimensional, Dimensions, EntityId, calculate_volume};

/// Validation error for product or box data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
}

pub(crate) fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

pub(crate) fn validate_weight_value(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidWeight(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

pub(crate) fn validate_name(id: EntityId, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidName(format!(
            "entry {} has an empty name",
            id
        )));
    }
    Ok(())
}

pub(crate) fn validate_measurements(dims: Dimensions) -> Result<(), ValidationError> {
    validate_dimension(dims.length, "Length")?;
    validate_dimension(dims.width, "Width")?;
    validate_dimension(dims.height, "Height")?;
    Ok(())
}

/// A product to be shipped.
///
/// The volume is derived from the measurements when the product is created.
/// Records coming from catalogs or requests may carry a stale or missing
/// volume, so use [`Product::with_recomputed_volume`] before allocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Product 1",
        "length": 10.0,
        "width": 20.0,
        "height": 10.0,
        "volume": 2000.0,
        "weight": 5.0
    })
)]
pub struct Product {
    pub id: EntityId,
    pub name: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub volume: f64,
    pub weight: f64,
}

impl Product {
    /// Creates a product and computes its volume.
    ///
    /// # Examples
    /// ```
    /// use box_allocator::model::Product;
    ///
    /// let product = Product::new(1, "Product 1", 10.0, 20.0, 10.0, 5.0);
    /// assert_eq!(product.volume, 2000.0);
    /// ```
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        length: f64,
        width: f64,
        height: f64,
        weight: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            length,
            width,
            height,
            volume: calculate_volume(length, width, height),
            weight,
        }
    }

    /// Returns the product with its volume derived from its measurements.
    pub fn with_recomputed_volume(mut self) -> Self {
        self.volume = calculate_volume(self.length, self.width, self.height);
        self
    }

    /// Checks name, measurements and weight.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(self.id, &self.name)?;
        validate_measurements(self.dimensions())?;
        validate_weight_value(self.weight, "Weight")?;
        Ok(())
    }
}

impl Dimensional for Product {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.length, self.width, self.height)
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

/// A shipping box loaded from the catalog.
///
/// `volume` and `weight_limit` start at the nominal capacity and shrink as
/// products are stored. A `ShippingBox` is only valid within one allocation
/// run; the catalog hands out fresh copies on every load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Small Box",
        "length": 20.0,
        "width": 15.0,
        "height": 10.0,
        "volume": 3000.0,
        "weight_limit": 10.0
    })
)]
pub struct ShippingBox {
    pub id: EntityId,
    pub name: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    /// Remaining volume in cm³.
    pub volume: f64,
    /// Remaining weight capacity in kg.
    pub weight_limit: f64,
}

impl ShippingBox {
    /// Creates an empty box with its full volume available.
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        length: f64,
        width: f64,
        height: f64,
        weight_limit: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            length,
            width,
            height,
            volume: calculate_volume(length, width, height),
            weight_limit,
        }
    }

    /// Deducts a product's volume and weight from the remaining capacity.
    ///
    /// Callers check the fit predicate first, so capacity never goes negative.
    pub fn store(&mut self, product: &Product) {
        self.volume -= product.volume;
        self.weight_limit -= product.weight;
    }

    /// Remaining weight capacity in kg.
    #[inline]
    pub fn remaining_weight(&self) -> f64 {
        self.weight_limit
    }

    /// Remaining volume in cm³.
    #[inline]
    pub fn remaining_volume(&self) -> f64 {
        self.volume
    }
}

impl Dimensional for ShippingBox {
    fn id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.length, self.width, self.height)
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_new_computes_volume() {
        let product = Product::new(3, "Product 2", 10.0, 15.0, 10.0, 7.0);
        assert_eq!(product.volume, 1500.0);
        assert_eq!(product.label(), "Product 2 (15x10x10)");
    }

    #[test]
    fn recomputed_volume_replaces_stale_value() {
        let json = r#"{"id": 4, "name": "Lamp", "length": 45.0, "width": 15.0, "height": 15.0, "weight": 1.8}"#;
        let product: Product = serde_json::from_str(json).expect("valid product JSON");
        assert_eq!(product.volume, 0.0);
        assert_eq!(product.with_recomputed_volume().volume, 10125.0);
    }

    #[test]
    fn product_validation_rejects_bad_values() {
        assert!(Product::new(1, "Ok", 1.0, 1.0, 1.0, 1.0).validate().is_ok());
        assert!(matches!(
            Product::new(1, "  ", 1.0, 1.0, 1.0, 1.0).validate(),
            Err(ValidationError::InvalidName(_))
        ));
        assert!(matches!(
            Product::new(1, "Flat", 1.0, 0.0, 1.0, 1.0).validate(),
            Err(ValidationError::InvalidDimension(_))
        ));
        assert!(matches!(
            Product::new(1, "Ghost", 1.0, 1.0, f64::NAN, 1.0).validate(),
            Err(ValidationError::InvalidDimension(_))
        ));
        assert!(matches!(
            Product::new(1, "Feather", 1.0, 1.0, 1.0, -1.0).validate(),
            Err(ValidationError::InvalidWeight(_))
        ));
    }

    #[test]
    fn store_deducts_remaining_capacity() {
        let mut shipping_box = ShippingBox::new(1, "Small Box", 20.0, 15.0, 10.0, 10.0);
        assert_eq!(shipping_box.remaining_volume(), 3000.0);

        let product = Product::new(3, "Product 2", 10.0, 15.0, 10.0, 7.0);
        shipping_box.store(&product);

        assert_eq!(shipping_box.remaining_volume(), 1500.0);
        assert_eq!(shipping_box.remaining_weight(), 3.0);
        assert_eq!(shipping_box.length, 20.0);
    }
}
