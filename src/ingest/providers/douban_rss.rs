use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::clean_text;
use crate::ingest::types::{SourceBatch, SourceProvider};
use crate::store::{save_batch, RecordStore, SaveReport};
use crate::timeline::item::to_iso;
use crate::timeline::sources::DoubanRssItem;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// Douban "interests" RSS feed (books/movies marked by the user).
pub struct DoubanRssProvider {
    mode: Mode,
    fetched_at: Option<String>,
}

enum Mode {
    // Own copy so tests need no 'static input.
    Fixture(String),
    File(PathBuf),
}

impl DoubanRssProvider {
    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
            fetched_at: None,
        }
    }

    /// Feed XML saved by an external fetcher.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            mode: Mode::File(path.into()),
            fetched_at: None,
        }
    }

    /// Pin the batch fetch time instead of stamping the current time.
    pub fn with_fetched_at(mut self, ts: impl Into<String>) -> Self {
        self.fetched_at = Some(ts.into());
        self
    }

    /// Parse the feed into a batch of records.
    pub fn fetch_batch(&self) -> Result<SourceBatch<DoubanRssItem>> {
        let xml = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::File(p) => std::fs::read_to_string(p)
                .with_context(|| format!("reading douban rss from {}", p.display()))?,
        };
        let fetched_at = self
            .fetched_at
            .clone()
            .unwrap_or_else(|| to_iso(&chrono::Utc::now()));
        parse_items_from_str(&xml, &fetched_at)
    }
}

/// Map RSS items to records. Rating and author are not part of the feed.
pub fn parse_items_from_str(s: &str, fetched_at: &str) -> Result<SourceBatch<DoubanRssItem>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(s);
    let rss: Rss = from_str(&xml_clean).context("parsing douban rss xml")?;

    let mut records = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let description = it
            .description
            .as_deref()
            .map(clean_text)
            .filter(|d| !d.is_empty());
        records.push(DoubanRssItem {
            title: it.title.map(|t| clean_text(&t)),
            url: it.link.map(|l| l.trim().to_string()),
            kind: Some("interest".to_string()),
            rating: None,
            author: None,
            published: it.pub_date.map(|d| d.trim().to_string()),
            formatted_date: None,
            description,
            fetched_at: Some(fetched_at.to_string()),
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_records_total", "platform" => "douban-rss").increment(records.len() as u64);

    Ok(SourceBatch {
        records,
        fetched_at: Some(fetched_at.to_string()),
    })
}

#[async_trait]
impl SourceProvider for DoubanRssProvider {
    async fn ingest(&self, store: &dyn RecordStore) -> Result<SaveReport> {
        let batch = self.fetch_batch()?;
        Ok(save_batch(store, &batch.records).await)
    }

    fn name(&self) -> &'static str {
        "douban-rss"
    }
}

// Entities HTML allows but bare XML does not.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
