use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Verdict;
use super::flag;

/// One image with its predicted and (optional) ground-truth verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageRecord {
    pub image_name: String,
    /// Display path used by the review page, already re-rooted under the image base.
    pub image_src: String,
    pub pred: Verdict,
    /// `None` when no usable label file was found for the image.
    pub gt: Option<Verdict>,
}

/// Images sharing an order id, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OrderGroup {
    pub order_id: String,
    #[serde(with = "flag")]
    #[schemars(with = "u8")]
    pub pred_order_pass: bool,
    /// `None` unless every image in the order has ground truth.
    #[serde(default, with = "flag::option")]
    #[schemars(with = "Option<u8>")]
    pub gt_order_pass: Option<bool>,
    pub images: Vec<ImageRecord>,
}

/// Top-level document consumed by the review page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct OrdersArtifact {
    /// Sorted by `order_id`.
    pub orders: Vec<OrderGroup>,
}

impl OrdersArtifact {
    pub fn image_count(&self) -> usize {
        self.orders.iter().map(|order| order.images.len()).sum()
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageRecord> {
        self.orders.iter().flat_map(|order| order.images.iter())
    }
}
