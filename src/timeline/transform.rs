//! # Transformers
//! One generic, pure transform from any [`SourceRecord`] to a [`TimelineItem`].
//!
//! Policy: a record without a parseable canonical timestamp, or without a
//! URL, yields `None` and is left out of the timeline. That is routine
//! input, not an error.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::timeline::item::{to_iso, Platform, SourceInfo, TimelineItem};
use crate::timeline::relative::format_relative_time;
use crate::timeline::sources::SourceRecord;

/// Normalize one record. `index` is its position in the source batch and
/// only feeds the batch-local `id`.
pub fn transform<R: SourceRecord>(
    record: &R,
    index: usize,
    batch_fetched_at: Option<&str>,
    now: DateTime<Utc>,
) -> Option<TimelineItem> {
    let platform = R::PLATFORM;

    let Some(published_at) = record.published_instant() else {
        tracing::debug!(
            platform = platform.as_str(),
            raw = ?record.raw_published(),
            title = ?record.title(),
            "dropping record without a usable publish time"
        );
        return None;
    };

    let Some(url) = record.url() else {
        tracing::debug!(platform = platform.as_str(), title = ?record.title(), "dropping record without url");
        return None;
    };

    let info = platform.info();
    let formatted_date = record
        .formatted_date()
        .map(str::to_string)
        .unwrap_or_else(|| format_relative_time(now, published_at));

    let fetched_at = record
        .fetched_at()
        .or(batch_fetched_at.map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_string)
        .or_else(|| R::FETCHED_AT_DEFAULTS_TO_NOW.then(|| to_iso(&now)));

    Some(TimelineItem {
        id: format!("{}-{}", platform.as_str(), index),
        platform,
        platform_name: info.name.to_string(),
        platform_icon: info.icon.to_string(),
        platform_color: info.color.to_string(),
        title: record.title().unwrap_or_default().to_string(),
        url: url.to_string(),
        description: record.description().map(str::to_string),
        thumbnail: record.thumbnail().map(str::to_string),
        published_at,
        formatted_date,
        metadata: record.metadata(),
        source: SourceInfo {
            platform,
            original_id: record.original_id().map(str::to_string),
            fetched_at,
            stable_id: record.natural_key().map(|k| stable_id(platform, &k)),
        },
    })
}

/// Transform a whole source batch; returns kept items and the drop count.
pub fn transform_batch<R: SourceRecord>(
    records: &[R],
    batch_fetched_at: Option<&str>,
    now: DateTime<Utc>,
) -> (Vec<TimelineItem>, usize) {
    let mut kept = Vec::with_capacity(records.len());
    for (i, r) in records.iter().enumerate() {
        if let Some(item) = transform(r, i, batch_fetched_at, now) {
            kept.push(item);
        }
    }
    let dropped = records.len() - kept.len();
    (kept, dropped)
}

/// Content-derived identity: first 8 bytes of SHA-256 over `platform|key`, hex.
pub fn stable_id(platform: Platform, natural_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(platform.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(natural_key.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::sources::{BilibiliVideo, DoubanRssItem, JianshuArticle, YouTubeVideo};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap()
    }

    #[test]
    fn id_is_platform_and_index() {
        let v = BilibiliVideo {
            title: Some("t".into()),
            url: Some("https://x/v1".into()),
            published_at: Some("2024-01-15T08:00:00Z".into()),
            ..Default::default()
        };
        let item = transform(&v, 7, None, now()).unwrap();
        assert_eq!(item.id, "bilibili-7");
    }

    #[test]
    fn existing_formatted_date_is_passed_through() {
        let v = YouTubeVideo {
            url: Some("https://yt/v".into()),
            published_at: Some("2024-01-18T00:00:00Z".into()),
            formatted_date: Some("custom".into()),
            ..Default::default()
        };
        assert_eq!(transform(&v, 0, None, now()).unwrap().formatted_date, "custom");
    }

    #[test]
    fn fetched_at_prefers_record_then_batch() {
        let mut d = DoubanRssItem {
            url: Some("https://douban/1".into()),
            published: Some("Mon, 15 Jan 2024 08:00:00 GMT".into()),
            ..Default::default()
        };
        let item = transform(&d, 0, Some("2024-01-19T00:00:00Z"), now()).unwrap();
        assert_eq!(item.source.fetched_at.as_deref(), Some("2024-01-19T00:00:00Z"));

        d.fetched_at = Some("2024-01-18T00:00:00Z".into());
        let item = transform(&d, 0, Some("2024-01-19T00:00:00Z"), now()).unwrap();
        assert_eq!(item.source.fetched_at.as_deref(), Some("2024-01-18T00:00:00Z"));
    }

    #[test]
    fn only_youtube_defaults_fetched_at_to_now() {
        let y = YouTubeVideo {
            url: Some("https://yt/v".into()),
            published_at: Some("2024-01-18T00:00:00Z".into()),
            ..Default::default()
        };
        let j = JianshuArticle {
            link: Some("https://jianshu/p/1".into()),
            published_at: Some("2024-01-18T00:00:00Z".into()),
            ..Default::default()
        };
        assert_eq!(
            transform(&y, 0, None, now()).unwrap().source.fetched_at.as_deref(),
            Some("2024-01-20T00:00:00Z")
        );
        assert_eq!(transform(&j, 0, None, now()).unwrap().source.fetched_at, None);
    }

    #[test]
    fn stable_id_depends_on_platform_and_key_only() {
        let a = stable_id(Platform::Bilibili, "https://x/v1");
        assert_eq!(a.len(), 16);
        assert_eq!(a, stable_id(Platform::Bilibili, "https://x/v1"));
        assert_ne!(a, stable_id(Platform::YouTube, "https://x/v1"));
    }

    #[test]
    fn batch_counts_drops() {
        let recs = vec![
            JianshuArticle {
                link: Some("https://jianshu/p/a".into()),
                published_at: Some("2024-01-10T00:00:00Z".into()),
                ..Default::default()
            },
            JianshuArticle {
                link: Some("https://jianshu/p/b".into()),
                published_at: None,
                ..Default::default()
            },
        ];
        let (kept, dropped) = transform_batch(&recs, None, now());
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 1);
        assert_eq!(kept[0].id, "jianshu-0");
    }
}
