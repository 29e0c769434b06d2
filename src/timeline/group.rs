//! Date buckets for display.
//!
//! Expects the merged feed (already sorted); re-sorts each bucket anyway so
//! the result does not depend on the caller.

use std::collections::HashMap;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::Serialize;

use crate::timeline::item::TimelineItem;

#[derive(Debug, Clone, Serialize)]
pub struct DateGroup {
    /// Calendar date in the grouping offset.
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDate,
    pub items: Vec<TimelineItem>,
}

fn serialize_date<S: serde::Serializer>(d: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&d.format("%Y-%m-%d").to_string())
}

/// Bucket by the local calendar date of `published_at` at `offset`.
pub fn group_by_date(items: Vec<TimelineItem>, offset: FixedOffset) -> Vec<DateGroup> {
    let mut order: Vec<NaiveDate> = Vec::new();
    let mut buckets: HashMap<NaiveDate, Vec<TimelineItem>> = HashMap::new();

    for item in items {
        let date = item.published_at.with_timezone(&offset).date_naive();
        buckets
            .entry(date)
            .or_insert_with(|| {
                order.push(date);
                Vec::new()
            })
            .push(item);
    }

    let mut groups: Vec<DateGroup> = order
        .into_iter()
        .filter_map(|date| {
            buckets.remove(&date).map(|mut items| {
                items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
                DateGroup { date, items }
            })
        })
        .collect();

    // Buckets are non-empty, so items[0] is each bucket's most recent entry.
    groups.sort_by(|a, b| b.items[0].published_at.cmp(&a.items[0].published_at));
    groups
}

/// Offset for a whole-hour UTC shift; out-of-range values fall back to UTC.
pub fn offset_from_hours(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
}
