//! # Timeline Engine
//! Loads every source from the record store, normalizes and merges them.
//!
//! Policy: a source that cannot be read contributes zero items; the
//! timeline is built from whatever sources succeeded and never fails as a
//! whole.

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;

use crate::store::{self, RecordStore};
use crate::timeline::merge::merge_batches;
use crate::timeline::sources::{BilibiliVideo, DoubanRssItem, JianshuArticle, SourceRecord, YouTubeVideo};
use crate::timeline::transform::transform_batch;
use crate::timeline::TimelineItem;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("timeline_items_total", "Items served in built timelines.");
        describe_counter!(
            "timeline_dropped_total",
            "Records left out for lacking a usable publish time or url."
        );
        describe_counter!(
            "timeline_source_errors_total",
            "Sources that could not be read while building a timeline."
        );
        describe_histogram!("timeline_build_ms", "Timeline build time in milliseconds.");
    });
}

/// Per-source numbers from one build, for logs and diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SourceStats {
    pub platform: &'static str,
    pub loaded: usize,
    pub kept: usize,
    pub dropped: usize,
    pub failed: bool,
}

/// Build the merged timeline from the store, newest first.
pub async fn build_timeline(
    store: &dyn RecordStore,
    limit: u32,
    now: DateTime<Utc>,
) -> Vec<TimelineItem> {
    build_timeline_with_stats(store, limit, now).await.0
}

pub async fn build_timeline_with_stats(
    store: &dyn RecordStore,
    limit: u32,
    now: DateTime<Utc>,
) -> (Vec<TimelineItem>, Vec<SourceStats>) {
    ensure_metrics_described();
    let t0 = std::time::Instant::now();

    let (douban, jianshu, bilibili, youtube) = tokio::join!(
        store::load_recent::<DoubanRssItem>(store, limit),
        store::load_recent::<JianshuArticle>(store, limit),
        store::load_recent::<BilibiliVideo>(store, limit),
        store::load_recent::<YouTubeVideo>(store, limit),
    );

    let mut batches = Vec::with_capacity(4);
    let mut stats = Vec::with_capacity(4);
    for (items, st) in [
        normalize_source(douban, now),
        normalize_source(jianshu, now),
        normalize_source(bilibili, now),
        normalize_source(youtube, now),
    ] {
        batches.push(items);
        stats.push(st);
    }

    let merged = merge_batches(batches);

    counter!("timeline_items_total").increment(merged.len() as u64);
    histogram!("timeline_build_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    tracing::debug!(items = merged.len(), ?stats, "timeline built");

    (merged, stats)
}

fn normalize_source<R: SourceRecord>(
    loaded: Result<Vec<R>>,
    now: DateTime<Utc>,
) -> (Vec<TimelineItem>, SourceStats) {
    let platform = R::PLATFORM.as_str();
    match loaded {
        Ok(records) => {
            let (items, dropped) = transform_batch(&records, None, now);
            if dropped > 0 {
                counter!("timeline_dropped_total", "platform" => platform).increment(dropped as u64);
            }
            let st = SourceStats {
                platform,
                loaded: records.len(),
                kept: items.len(),
                dropped,
                failed: false,
            };
            (items, st)
        }
        Err(e) => {
            tracing::warn!(error = ?e, platform, "source unavailable; omitted from timeline");
            counter!("timeline_source_errors_total", "platform" => platform).increment(1);
            let st = SourceStats {
                platform,
                failed: true,
                ..SourceStats::default()
            };
            (Vec::new(), st)
        }
    }
}
