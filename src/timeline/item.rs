//! # Unified timeline schema
//! `TimelineItem` is the one shape every platform record is normalized into.
//! Items are recomputed on each read and never persisted.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Closed set of platform tags a timeline item can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "douban-rss")]
    DoubanRss,
    #[serde(rename = "douban")]
    Douban,
    #[serde(rename = "jianshu")]
    Jianshu,
    #[serde(rename = "bilibili")]
    Bilibili,
    #[serde(rename = "youtube")]
    YouTube,
}

/// Static display metadata for a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformInfo {
    pub name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

const DOUBAN_RSS_INFO: PlatformInfo = PlatformInfo {
    name: "Douban",
    icon: "📚",
    color: "bg-yellow-100 text-yellow-700 border-yellow-200",
};
const DOUBAN_INFO: PlatformInfo = PlatformInfo {
    name: "Douban",
    icon: "🎬",
    color: "bg-orange-100 text-orange-700 border-orange-200",
};
const JIANSHU_INFO: PlatformInfo = PlatformInfo {
    name: "Jianshu",
    icon: "📝",
    color: "bg-green-100 text-green-700 border-green-200",
};
const BILIBILI_INFO: PlatformInfo = PlatformInfo {
    name: "Bilibili",
    icon: "📱",
    color: "bg-pink-100 text-pink-700 border-pink-200",
};
const YOUTUBE_INFO: PlatformInfo = PlatformInfo {
    name: "YouTube",
    icon: "📺",
    color: "bg-red-100 text-red-700 border-red-200",
};

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::DoubanRss,
        Platform::Douban,
        Platform::Jianshu,
        Platform::Bilibili,
        Platform::YouTube,
    ];

    /// Wire tag, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::DoubanRss => "douban-rss",
            Platform::Douban => "douban",
            Platform::Jianshu => "jianshu",
            Platform::Bilibili => "bilibili",
            Platform::YouTube => "youtube",
        }
    }

    pub fn info(self) -> &'static PlatformInfo {
        match self {
            Platform::DoubanRss => &DOUBAN_RSS_INFO,
            Platform::Douban => &DOUBAN_INFO,
            Platform::Jianshu => &JIANSHU_INFO,
            Platform::Bilibili => &BILIBILI_INFO,
            Platform::YouTube => &YOUTUBE_INFO,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional per-platform fields. Absent values are omitted from JSON,
/// never rendered as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<String>,
    /// Raw, human-readable publish time text as scraped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// Provenance of a timeline item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
    /// Content-derived id: survives re-fetches that reorder the batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stable_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    /// `{platform}-{index}`; unique within one rendering batch only.
    pub id: String,
    pub platform: Platform,
    pub platform_name: String,
    pub platform_icon: String,
    pub platform_color: String,
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(serialize_with = "serialize_instant")]
    pub published_at: DateTime<Utc>,
    pub formatted_date: String,
    pub metadata: Metadata,
    pub source: SourceInfo,
}

impl TimelineItem {
    /// `publishedAt` as it appears on the wire.
    pub fn published_at_iso(&self) -> String {
        to_iso(&self.published_at)
    }
}

/// ISO-8601 UTC with a `Z` suffix; sub-second digits only when non-zero.
pub fn to_iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn serialize_instant<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&to_iso(ts))
}
