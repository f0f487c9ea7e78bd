//! Grouping image records into delivery orders.

use std::collections::BTreeMap;

use crate::schema::{ImageRecord, OrderGroup, Verdict};

/// Order id of an image: its first two `_`-separated segments.
///
/// `general_SWX0031_jpg_2026` belongs to order `general_SWX0031`. Names with
/// fewer than two segments are their own order id.
pub fn order_id(image_name: &str) -> String {
    let mut segments = image_name.splitn(3, '_');
    match (segments.next(), segments.next()) {
        (Some(first), Some(second)) => format!("{first}_{second}"),
        _ => image_name.to_string(),
    }
}

/// An order passes when no photo shows the parcel in a mailbox and at least
/// one photo passes every check.
pub fn order_passes<'a, I>(verdicts: I) -> bool
where
    I: IntoIterator<Item = &'a Verdict>,
{
    let mut all_not_in_mailbox = true;
    let mut any_full_pass = false;
    for verdict in verdicts {
        all_not_in_mailbox &= verdict.steps.not_in_mailbox;
        any_full_pass |= verdict.overall_pass;
    }
    all_not_in_mailbox && any_full_pass
}

impl OrderGroup {
    /// Builds a group and its pass verdicts from images already sharing `order_id`.
    pub fn from_images(order_id: String, images: Vec<ImageRecord>) -> Self {
        let pred_order_pass = order_passes(images.iter().map(|image| &image.pred));
        let gt_order_pass = images
            .iter()
            .map(|image| image.gt.as_ref())
            .collect::<Option<Vec<_>>>()
            .map(order_passes);
        Self {
            order_id,
            pred_order_pass,
            gt_order_pass,
            images,
        }
    }
}

/// Groups records by order id. Groups come back sorted by id; images keep
/// their relative input order within a group.
pub fn group_orders<I>(records: I) -> Vec<OrderGroup>
where
    I: IntoIterator<Item = ImageRecord>,
{
    let mut groups: BTreeMap<String, Vec<ImageRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(order_id(&record.image_name))
            .or_default()
            .push(record);
    }
    groups
        .into_iter()
        .map(|(id, images)| OrderGroup::from_images(id, images))
        .collect()
}
