//! Turns per-product box assignments into per-box product lists.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Product, ShippingBox};
use crate::types::EntityId;

/// One box together with the products assigned to it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoxGroup {
    #[serde(rename = "box")]
    pub shipping_box: ShippingBox,
    /// Products in the order they were assigned.
    pub products: Vec<Product>,
}

/// Box → products mapping, keyed by box id.
///
/// Iteration follows the order in which boxes were first encountered.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GroupedAllocation {
    groups: Vec<BoxGroup>,
}

impl GroupedAllocation {
    /// Number of boxes in use.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Products assigned to the box with the given id.
    pub fn get(&self, box_id: EntityId) -> Option<&[Product]> {
        self.group(box_id).map(|group| group.products.as_slice())
    }

    pub fn group(&self, box_id: EntityId) -> Option<&BoxGroup> {
        self.groups
            .iter()
            .find(|group| group.shipping_box.id == box_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoxGroup> {
        self.groups.iter()
    }

    /// Total number of grouped products across all boxes.
    pub fn product_count(&self) -> usize {
        self.groups.iter().map(|group| group.products.len()).sum()
    }

    pub fn into_groups(self) -> Vec<BoxGroup> {
        self.groups
    }
}

impl IntoIterator for GroupedAllocation {
    type Item = BoxGroup;
    type IntoIter = std::vec::IntoIter<BoxGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

/// Buckets products under their assigned box.
///
/// A bucket is created the first time a box id shows up and appended to
/// afterwards, so product order inside a bucket matches assignment order.
/// The box snapshot stored in the bucket is the first one seen for that id.
pub fn group_products_in_a_box<'a>(
    assignments: impl IntoIterator<Item = (&'a Product, &'a ShippingBox)>,
) -> GroupedAllocation {
    let mut positions: HashMap<EntityId, usize> = HashMap::new();
    let mut groups: Vec<BoxGroup> = Vec::new();

    for (product, shipping_box) in assignments {
        let index = *positions.entry(shipping_box.id).or_insert_with(|| {
            groups.push(BoxGroup {
                shipping_box: shipping_box.clone(),
                products: Vec::new(),
            });
            groups.len() - 1
        });
        groups[index].products.push(product.clone());
    }

    GroupedAllocation { groups }
}
