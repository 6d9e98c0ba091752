//! Greedy allocation of products into shipping boxes.
//!
//! Products are matched against a fixed catalog of box types by ascending
//! volume. See [`selector`] for the algorithm and [`api`] for the HTTP
//! service wrapping it.

pub mod api;
pub mod catalog;
pub mod config;
pub mod fit;
pub mod grouping;
pub mod model;
pub mod selector;
pub mod types;

pub use catalog::{BoxCatalog, ProductCatalog, get_boxes};
pub use fit::can_fit_in_box;
pub use grouping::{GroupedAllocation, group_products_in_a_box};
pub use model::{Product, ShippingBox};
pub use selector::{SelectionResult, select_box};
pub use types::calculate_volume;
