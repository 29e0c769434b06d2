//! Raw per-platform records and their normalization configuration.
//!
//! Every field is optional so that incomplete upstream data still
//! deserializes; deciding what is usable is the transformer's job.
//! The [`SourceRecord`] impls are the per-platform configuration the
//! generic transform and the store are driven by.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::timeline::item::{Metadata, Platform};
use crate::timeline::parse::{parse_iso_instant, parse_rfc822};

/// How a platform encodes its canonical publish timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    Iso8601,
    Rfc822,
}

pub trait SourceRecord: Serialize + DeserializeOwned + Send + Sync + 'static {
    const PLATFORM: Platform;
    /// Storage table holding this platform's payloads.
    const TABLE: &'static str;
    const TIMESTAMP_FORMAT: TimestampFormat;
    /// JSON field carrying the canonical timestamp.
    const TIMESTAMP_FIELD: &'static str;
    /// Alternate JSON field consulted when the canonical one is absent.
    const TIMESTAMP_ALIAS: Option<&'static str> = None;
    /// Stamp `now` as fetch time when neither record nor batch has one.
    const FETCHED_AT_DEFAULTS_TO_NOW: bool = false;

    fn raw_published(&self) -> Option<&str>;
    fn title(&self) -> Option<&str>;
    fn url(&self) -> Option<&str>;
    /// Identity used for upserts; `None` means the record cannot be stored.
    fn natural_key(&self) -> Option<String>;
    fn fetched_at(&self) -> Option<&str>;
    fn formatted_date(&self) -> Option<&str>;
    fn metadata(&self) -> Metadata;

    fn description(&self) -> Option<&str> {
        None
    }
    fn thumbnail(&self) -> Option<&str> {
        None
    }
    fn original_id(&self) -> Option<&str> {
        None
    }

    /// Canonical publish instant, parsed per [`Self::TIMESTAMP_FORMAT`].
    fn published_instant(&self) -> Option<DateTime<Utc>> {
        let raw = self.raw_published()?;
        match Self::TIMESTAMP_FORMAT {
            TimestampFormat::Iso8601 => parse_iso_instant(raw),
            TimestampFormat::Rfc822 => parse_rfc822(raw),
        }
    }
}

/// Copy the alternate timestamp field into the canonical one when the
/// canonical field is missing or null.
pub fn resolve_timestamp_alias<R: SourceRecord>(payload: &mut Value) {
    let Some(alias) = R::TIMESTAMP_ALIAS else {
        return;
    };
    let Some(obj) = payload.as_object_mut() else {
        return;
    };
    let canonical_missing = obj
        .get(R::TIMESTAMP_FIELD)
        .map_or(true, |v| v.is_null());
    if !canonical_missing {
        return;
    }
    if let Some(alt) = obj.remove(alias) {
        if alt.is_string() {
            obj.insert(R::TIMESTAMP_FIELD.to_string(), alt);
        }
    }
}

/// Empty and whitespace-only strings count as absent.
pub(crate) fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn owned(v: &Option<String>) -> Option<String> {
    non_empty(v).map(str::to_string)
}

/// `https://www.jianshu.com/p/<slug>` → `<slug>`.
pub fn jianshu_slug_from_link(link: &str) -> Option<String> {
    static RE_SLUG: OnceCell<Regex> = OnceCell::new();
    let re = RE_SLUG.get_or_init(|| Regex::new(r"/p/([A-Za-z0-9]+)").expect("slug regex"));
    re.captures(link).map(|c| c[1].to_string())
}

/// Video id from `watch?v=`, `youtu.be/`, `/shorts/` or `/embed/` urls.
pub fn youtube_id_from_url(url: &str) -> Option<String> {
    static RE_VID: OnceCell<Regex> = OnceCell::new();
    let re = RE_VID.get_or_init(|| {
        Regex::new(r"(?:[?&]v=|youtu\.be/|/shorts/|/embed/)([A-Za-z0-9_-]{6,})").expect("video id regex")
    });
    re.captures(url).map(|c| c[1].to_string())
}

/// Accept `"123"`, `123` or `null` for counters scraped as either type.
fn de_lenient_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/* ----------------------------
Douban (interests RSS feed)
---------------------------- */

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoubanRssItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// RSS `pubDate`, RFC-822.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(rename = "formattedDate", default, skip_serializing_if = "Option::is_none")]
    pub formatted_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
}

impl SourceRecord for DoubanRssItem {
    const PLATFORM: Platform = Platform::DoubanRss;
    const TABLE: &'static str = "douban_interests";
    const TIMESTAMP_FORMAT: TimestampFormat = TimestampFormat::Rfc822;
    const TIMESTAMP_FIELD: &'static str = "published";

    fn raw_published(&self) -> Option<&str> {
        non_empty(&self.published)
    }
    fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }
    fn url(&self) -> Option<&str> {
        non_empty(&self.url)
    }
    fn natural_key(&self) -> Option<String> {
        owned(&self.url)
    }
    fn fetched_at(&self) -> Option<&str> {
        non_empty(&self.fetched_at)
    }
    fn formatted_date(&self) -> Option<&str> {
        non_empty(&self.formatted_date)
    }
    fn description(&self) -> Option<&str> {
        non_empty(&self.description)
    }

    fn metadata(&self) -> Metadata {
        let kind = non_empty(&self.kind).map(|k| match k {
            "interest" => "collection".to_string(),
            other => other.to_string(),
        });
        Metadata {
            kind,
            author: owned(&self.author),
            rating: owned(&self.rating),
            ..Metadata::default()
        }
    }
}

/* ----------------------------
Jianshu (articles)
---------------------------- */

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JianshuArticle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
    #[serde(rename = "formattedDate", default, skip_serializing_if = "Option::is_none")]
    pub formatted_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl SourceRecord for JianshuArticle {
    const PLATFORM: Platform = Platform::Jianshu;
    const TABLE: &'static str = "jianshu_articles";
    const TIMESTAMP_FORMAT: TimestampFormat = TimestampFormat::Iso8601;
    const TIMESTAMP_FIELD: &'static str = "published_at";
    const TIMESTAMP_ALIAS: Option<&'static str> = Some("published");

    fn raw_published(&self) -> Option<&str> {
        non_empty(&self.published_at)
    }
    fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }
    fn url(&self) -> Option<&str> {
        non_empty(&self.link)
    }
    /// The slug, taken from the link when the record lacks one, so a record
    /// seen first with only one of them keeps its identity.
    fn natural_key(&self) -> Option<String> {
        owned(&self.slug)
            .or_else(|| non_empty(&self.link).and_then(jianshu_slug_from_link))
            .or_else(|| owned(&self.link))
    }
    fn fetched_at(&self) -> Option<&str> {
        non_empty(&self.fetched_at)
    }
    fn formatted_date(&self) -> Option<&str> {
        non_empty(&self.formatted_date)
    }
    fn original_id(&self) -> Option<&str> {
        non_empty(&self.slug)
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            kind: Some("article".to_string()),
            slug: owned(&self.slug),
            user_id: owned(&self.user_id),
            ..Metadata::default()
        }
    }
}

/* ----------------------------
Bilibili (videos)
---------------------------- */

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilibiliVideo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Human-readable publish time as shown on the site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub play_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "formattedDate", default, skip_serializing_if = "Option::is_none")]
    pub formatted_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
}

impl SourceRecord for BilibiliVideo {
    const PLATFORM: Platform = Platform::Bilibili;
    const TABLE: &'static str = "bilibili_videos";
    const TIMESTAMP_FORMAT: TimestampFormat = TimestampFormat::Iso8601;
    const TIMESTAMP_FIELD: &'static str = "published_at";
    const TIMESTAMP_ALIAS: Option<&'static str> = Some("published");

    fn raw_published(&self) -> Option<&str> {
        non_empty(&self.published_at)
    }
    fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }
    fn url(&self) -> Option<&str> {
        non_empty(&self.url)
    }
    fn natural_key(&self) -> Option<String> {
        owned(&self.url)
    }
    fn fetched_at(&self) -> Option<&str> {
        non_empty(&self.fetched_at)
    }
    fn formatted_date(&self) -> Option<&str> {
        non_empty(&self.formatted_date)
    }
    fn description(&self) -> Option<&str> {
        non_empty(&self.description)
    }
    fn thumbnail(&self) -> Option<&str> {
        non_empty(&self.cover_url)
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            kind: Some("video".to_string()),
            play_count: owned(&self.play_count),
            publish_time: owned(&self.publish_time),
            cover_url: owned(&self.cover_url),
            ..Metadata::default()
        }
    }
}

/* ----------------------------
YouTube (channel videos)
---------------------------- */

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YouTubeVideo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(rename = "formattedDate", default, skip_serializing_if = "Option::is_none")]
    pub formatted_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
}

impl SourceRecord for YouTubeVideo {
    const PLATFORM: Platform = Platform::YouTube;
    const TABLE: &'static str = "youtube_videos";
    const TIMESTAMP_FORMAT: TimestampFormat = TimestampFormat::Iso8601;
    const TIMESTAMP_FIELD: &'static str = "published_at";
    const TIMESTAMP_ALIAS: Option<&'static str> = Some("published");
    const FETCHED_AT_DEFAULTS_TO_NOW: bool = true;

    fn raw_published(&self) -> Option<&str> {
        non_empty(&self.published_at)
    }
    fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }
    fn url(&self) -> Option<&str> {
        non_empty(&self.url)
    }
    /// The video id, taken from the url when the record lacks one.
    fn natural_key(&self) -> Option<String> {
        owned(&self.video_id)
            .or_else(|| non_empty(&self.url).and_then(youtube_id_from_url))
            .or_else(|| owned(&self.url))
    }
    fn fetched_at(&self) -> Option<&str> {
        non_empty(&self.fetched_at)
    }
    fn formatted_date(&self) -> Option<&str> {
        non_empty(&self.formatted_date)
    }
    fn description(&self) -> Option<&str> {
        non_empty(&self.description)
    }
    fn thumbnail(&self) -> Option<&str> {
        non_empty(&self.thumbnail_url)
    }
    fn original_id(&self) -> Option<&str> {
        non_empty(&self.video_id)
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            kind: Some("video".to_string()),
            video_id: owned(&self.video_id),
            channel_name: owned(&self.channel_name),
            thumbnail_url: owned(&self.thumbnail_url),
            ..Metadata::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn play_count_accepts_number_or_string() {
        let a: BilibiliVideo = serde_json::from_value(json!({ "play_count": 100 })).unwrap();
        let b: BilibiliVideo = serde_json::from_value(json!({ "play_count": "100" })).unwrap();
        let c: BilibiliVideo = serde_json::from_value(json!({ "play_count": null })).unwrap();
        assert_eq!(a.play_count.as_deref(), Some("100"));
        assert_eq!(b.play_count.as_deref(), Some("100"));
        assert_eq!(c.play_count, None);
    }

    #[test]
    fn alias_fills_missing_canonical_field() {
        let mut v = json!({ "title": "t", "published_at": null, "published": "2024-01-01T00:00:00Z" });
        resolve_timestamp_alias::<JianshuArticle>(&mut v);
        assert_eq!(v["published_at"], "2024-01-01T00:00:00Z");
        assert!(v.get("published").is_none());
    }

    #[test]
    fn alias_never_overrides_canonical_field() {
        let mut v = json!({ "published_at": "2024-02-02T00:00:00Z", "published": "2020-01-01T00:00:00Z" });
        resolve_timestamp_alias::<YouTubeVideo>(&mut v);
        assert_eq!(v["published_at"], "2024-02-02T00:00:00Z");
    }

    #[test]
    fn douban_has_no_alias() {
        let mut v = json!({ "published": "Mon, 04 Nov 2024 15:00:00 GMT" });
        resolve_timestamp_alias::<DoubanRssItem>(&mut v);
        assert_eq!(v["published"], "Mon, 04 Nov 2024 15:00:00 GMT");
    }

    #[test]
    fn natural_keys_follow_platform_identity() {
        let j = JianshuArticle {
            slug: Some("abc".into()),
            ..Default::default()
        };
        assert_eq!(j.natural_key().as_deref(), Some("abc"));

        let y = YouTubeVideo {
            video_id: Some("vid1".into()),
            url: Some("https://youtube.test/watch?v=vid1".into()),
            ..Default::default()
        };
        assert_eq!(y.natural_key().as_deref(), Some("vid1"));

        let y2 = YouTubeVideo {
            url: Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1".into()),
            ..Default::default()
        };
        assert_eq!(y2.natural_key().as_deref(), Some("dQw4w9WgXcQ"));
        let y3 = YouTubeVideo {
            url: Some("https://youtu.be/dQw4w9WgXcQ".into()),
            ..Default::default()
        };
        assert_eq!(y3.natural_key(), y2.natural_key());

        let j2 = JianshuArticle {
            link: Some("https://www.jianshu.com/p/abc".into()),
            ..Default::default()
        };
        assert_eq!(j2.natural_key().as_deref(), Some("abc"));

        let b = BilibiliVideo {
            url: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(b.natural_key(), None);
    }

    #[test]
    fn empty_strings_are_omitted_from_metadata() {
        let d = DoubanRssItem {
            kind: Some("interest".into()),
            author: Some(String::new()),
            rating: Some(String::new()),
            ..Default::default()
        };
        let m = d.metadata();
        assert_eq!(m.kind.as_deref(), Some("collection"));
        assert_eq!(m.author, None);
        assert_eq!(m.rating, None);
    }
}
