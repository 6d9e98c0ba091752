//! Static catalogs of box types and selectable products.
//!
//! The box catalog is read-only input. Every call to
//! [`BoxCatalog::get_boxes`] hands out new `ShippingBox` values whose capacity
//! the selector may consume without touching the catalog itself.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::{
    Product, ShippingBox, ValidationError, validate_measurements, validate_name,
    validate_weight_value,
};
use crate::selector::FALLBACK_BOX_INDEX;
use crate::types::{Dimensions, EntityId};

/// Smallest catalog the selector can work with.
pub const MIN_BOX_COUNT: usize = FALLBACK_BOX_INDEX + 1;

// (id, name, length, width, height, weight_limit), smallest first.
const BUILTIN_BOXES: [(EntityId, &str, f64, f64, f64, f64); 5] = [
    (1, "Small Box", 20.0, 15.0, 10.0, 10.0),
    (2, "Medium Box", 30.0, 20.0, 15.0, 15.0),
    (3, "Large Box", 40.0, 30.0, 20.0, 20.0),
    (4, "Extra Large Box", 50.0, 40.0, 30.0, 25.0),
    (5, "Jumbo Box", 60.0, 50.0, 40.0, 30.0),
];

// (id, name, length, width, height, weight)
const BUILTIN_PRODUCTS: [(EntityId, &str, f64, f64, f64, f64); 10] = [
    (1, "Wireless Mouse", 12.0, 7.0, 4.0, 0.2),
    (2, "Laptop", 36.0, 25.0, 3.0, 2.1),
    (3, "Coffee Maker", 30.0, 20.0, 35.0, 4.5),
    (4, "Desk Lamp", 45.0, 15.0, 15.0, 1.8),
    (5, "Headphones", 20.0, 18.0, 9.0, 0.35),
    (6, "Monitor", 65.0, 45.0, 15.0, 6.5),
    (7, "Yoga Mat", 60.0, 15.0, 15.0, 1.2),
    (8, "Cast Iron Pan", 40.0, 28.0, 8.0, 3.6),
    (9, "Blender", 20.0, 20.0, 40.0, 3.9),
    (10, "Hardcover Book", 24.0, 16.0, 4.0, 0.9),
];

/// Errors raised while loading or validating a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("box catalog holds {available} boxes, at least {required} are required")]
    TooFewBoxes { required: usize, available: usize },
    #[error("catalog contains id {0} more than once")]
    DuplicateId(EntityId),
    #[error("catalog entry {id} is invalid: {source}")]
    InvalidEntry {
        id: EntityId,
        #[source]
        source: ValidationError,
    },
}

/// One box type as stored in the catalog. The volume is derived on load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Small Box",
        "length": 20.0,
        "width": 15.0,
        "height": 10.0,
        "weight_limit": 10.0
    })
)]
pub struct BoxSpec {
    pub id: EntityId,
    pub name: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight_limit: f64,
}

impl BoxSpec {
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
            weight_limit,
        }
    }

    /// Instantiates an empty box with the full capacity of this type.
    pub fn instantiate(&self) -> ShippingBox {
        ShippingBox::new(
            self.id,
            self.name.clone(),
            self.length,
            self.width,
            self.height,
            self.weight_limit,
        )
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_name(self.id, &self.name)?;
        validate_measurements(Dimensions::new(self.length, self.width, self.height))?;
        validate_weight_value(self.weight_limit, "Weight limit")?;
        Ok(())
    }
}

fn ensure_unique_ids(ids: impl IntoIterator<Item = EntityId>) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId(id));
        }
    }
    Ok(())
}

fn read_catalog_file(path: &Path) -> Result<String, CatalogError> {
    fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// The ordered list of available box types.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxCatalog {
    specs: Vec<BoxSpec>,
}

impl BoxCatalog {
    /// Creates a catalog after checking size, ids and measurements.
    pub fn new(specs: Vec<BoxSpec>) -> Result<Self, CatalogError> {
        if specs.len() < MIN_BOX_COUNT {
            return Err(CatalogError::TooFewBoxes {
                required: MIN_BOX_COUNT,
                available: specs.len(),
            });
        }
        ensure_unique_ids(specs.iter().map(|spec| spec.id))?;
        for spec in &specs {
            spec.validate()
                .map_err(|source| CatalogError::InvalidEntry { id: spec.id, source })?;
        }
        Ok(Self { specs })
    }

    /// The five standard box types, smallest first.
    pub fn builtin() -> Self {
        let specs = BUILTIN_BOXES
            .iter()
            .map(|&(id, name, length, width, height, weight_limit)| {
                BoxSpec::new(id, name, length, width, height, weight_limit)
            })
            .collect();
        Self { specs }
    }

    /// Parses a JSON array of box records. A `volume` field is ignored.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let specs: Vec<BoxSpec> = serde_json::from_str(raw)?;
        Self::new(specs)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = read_catalog_file(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Loads fresh boxes with computed volume, in catalog order.
    ///
    /// # Examples
    /// ```
    /// use box_allocator::catalog::BoxCatalog;
    ///
    /// let catalog = BoxCatalog::builtin();
    /// let mut first = catalog.get_boxes();
    /// first[0].weight_limit = 0.0;
    /// assert_eq!(catalog.get_boxes()[0].weight_limit, 10.0);
    /// ```
    pub fn get_boxes(&self) -> Vec<ShippingBox> {
        self.specs.iter().map(BoxSpec::instantiate).collect()
    }

    pub fn specs(&self) -> &[BoxSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for BoxCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Loads fresh boxes from the built-in catalog.
pub fn get_boxes() -> Vec<ShippingBox> {
    BoxCatalog::builtin().get_boxes()
}

/// Products a caller can pick from, sorted by name.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductCatalog {
    entries: Vec<Product>,
}

impl ProductCatalog {
    /// Creates a catalog; volumes are recomputed and entries sorted by name.
    pub fn new(entries: Vec<Product>) -> Result<Self, CatalogError> {
        ensure_unique_ids(entries.iter().map(|product| product.id))?;
        for product in &entries {
            product.validate().map_err(|source| CatalogError::InvalidEntry {
                id: product.id,
                source,
            })?;
        }
        Ok(Self::sorted(entries))
    }

    pub fn builtin() -> Self {
        let entries = BUILTIN_PRODUCTS
            .iter()
            .map(|&(id, name, length, width, height, weight)| {
                Product::new(id, name, length, width, height, weight)
            })
            .collect();
        Self::sorted(entries)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let entries: Vec<Product> = serde_json::from_str(raw)?;
        Self::new(entries)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = read_catalog_file(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    fn sorted(entries: Vec<Product>) -> Self {
        let mut entries: Vec<Product> = entries
            .into_iter()
            .map(Product::with_recomputed_volume)
            .collect();
        entries.sort_by_cached_key(|product| product.name.to_lowercase());
        Self { entries }
    }

    /// All entries, sorted by name.
    pub fn entries(&self) -> &[Product] {
        &self.entries
    }

    /// Picks a product by id, returning a new value with its volume computed.
    pub fn select(&self, id: EntityId) -> Option<Product> {
        self.entries
            .iter()
            .find(|product| product.id == id)
            .cloned()
            .map(Product::with_recomputed_volume)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
