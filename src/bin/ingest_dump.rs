//! Upsert one upstream artifact into the configured database.
//!
//! Usage: `ingest_dump <douban|jianshu|bilibili|youtube> <path>`
//!
//! A `.xml` path for `douban` is read as the Douban RSS feed; everything else
//! is a spider JSON dump.

use std::path::Path;

use anyhow::{bail, Context, Result};

use ilog_timeline::ingest::providers::{DoubanRssProvider, DumpProvider};
use ilog_timeline::ingest::run_once;
use ilog_timeline::ingest::types::SourceProvider;
use ilog_timeline::timeline::sources::{BilibiliVideo, DoubanRssItem, JianshuArticle, YouTubeVideo};
use ilog_timeline::{AppConfig, SqliteStore};

fn provider_for(source: &str, path: &Path) -> Result<Box<dyn SourceProvider>> {
    let is_xml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"));
    let p: Box<dyn SourceProvider> = match source {
        "douban" if is_xml => Box::new(DoubanRssProvider::from_path(path)),
        "douban" => Box::new(DumpProvider::<DoubanRssItem>::from_path(path)),
        "jianshu" => Box::new(DumpProvider::<JianshuArticle>::from_path(path)),
        "bilibili" => Box::new(DumpProvider::<BilibiliVideo>::from_path(path)),
        "youtube" => Box::new(DumpProvider::<YouTubeVideo>::from_path(path)),
        other => bail!("unknown source {other:?} (douban|jianshu|bilibili|youtube)"),
    };
    Ok(p)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    ilog_timeline::init_tracing();

    let mut args = std::env::args().skip(1);
    let (Some(source), Some(path)) = (args.next(), args.next()) else {
        bail!("usage: ingest_dump <douban|jianshu|bilibili|youtube> <path>");
    };

    let config = AppConfig::load_default().context("loading app config")?;
    let store = SqliteStore::connect(&config.database_url).await?;
    let provider = provider_for(&source, Path::new(&path))?;

    let outcomes = run_once(std::slice::from_ref(&provider), &store).await;
    println!("{}", serde_json::to_string_pretty(&outcomes)?);

    if outcomes.iter().any(|o| !o.success) {
        bail!("ingest of {path} failed");
    }
    Ok(())
}
