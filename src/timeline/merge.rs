//! Merge/sort engine: one ordered feed out of every source's items.

use crate::timeline::item::TimelineItem;

/// Sort by `published_at`, most recent first.
///
/// Total (nothing is filtered) and stable: items with identical timestamps
/// keep their input order.
pub fn merge_and_sort(mut items: Vec<TimelineItem>) -> Vec<TimelineItem> {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    items
}

/// Concatenate per-source batches in the given order, then sort.
pub fn merge_batches<I>(batches: I) -> Vec<TimelineItem>
where
    I: IntoIterator<Item = Vec<TimelineItem>>,
{
    let all: Vec<TimelineItem> = batches.into_iter().flatten().collect();
    merge_and_sort(all)
}
