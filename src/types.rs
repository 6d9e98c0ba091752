//! Common types and traits for dimensional entities.
//!
//! Products and shipping boxes share the same physical shape: an id, a
//! display name, three measurements in centimeters and a volume. The traits
//! here give both a common interface so the fit predicate and the grouping
//! code can treat them uniformly.

use std::fmt;

/// Identifier of a product or box.
pub type EntityId = u32;

/// Calculates the volume of a cuboid.
///
/// Returns the plain product of the three inputs. Signs and ranges are not
/// checked, so zero or negative measurements pass through unchanged.
///
/// # Examples
/// ```
/// use box_allocator::types::calculate_volume;
///
/// assert_eq!(calculate_volume(2.0, 3.0, 4.0), 24.0);
/// ```
#[inline]
pub fn calculate_volume(length: f64, width: f64, height: f64) -> f64 {
    length * width * height
}

/// Length, width and height of a physical item in centimeters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    /// Creates a new set of measurements.
    #[inline]
    pub const fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    /// Volume of the cuboid spanned by these measurements.
    #[inline]
    pub fn volume(&self) -> f64 {
        calculate_volume(self.length, self.width, self.height)
    }

    /// Checks whether every axis is at most the matching axis of `outer`.
    ///
    /// Axes are compared positionally. No rotation is attempted, so an item
    /// that would fit after turning it can still be reported as too large.
    #[inline]
    pub fn fits_within(&self, outer: &Self) -> bool {
        outer.width >= self.width && outer.height >= self.height && outer.length >= self.length
    }

    /// Label in the width×height×length order used for display.
    pub fn display_label(&self) -> String {
        format!("{}x{}x{}", self.width, self.height, self.length)
    }
}

/// Formats as `length x width x height`, the order used in placement errors.
impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.length, self.width, self.height)
    }
}

/// Trait for entities with an identity and a physical extent.
pub trait Dimensional {
    /// Stable identifier of the entity.
    fn id(&self) -> EntityId;

    /// Display name.
    fn name(&self) -> &str;

    /// Measurements of the entity.
    fn dimensions(&self) -> Dimensions;

    /// Current volume. For boxes this is the remaining capacity.
    fn volume(&self) -> f64;

    /// Display label, e.g. `Small Box (15x10x20)`.
    fn label(&self) -> String {
        format!("{} ({})", self.name(), self.dimensions().display_label())
    }
}
