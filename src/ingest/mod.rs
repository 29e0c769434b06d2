// src/ingest/mod.rs
pub mod providers;
pub mod types;

use anyhow::{anyhow, Context, Result};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use serde_json::Value;

use crate::ingest::types::{IngestOutcome, SourceBatch, SourceProvider};
use crate::store::RecordStore;
use crate::timeline::sources::{resolve_timestamp_alias, SourceRecord};

/// Keys spider dumps use for their record list.
const DUMP_LIST_KEYS: [&str; 4] = ["collections", "articles", "videos", "items"];

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_records_total", "Records parsed from providers.");
        describe_counter!(
            "ingest_rejected_total",
            "Dump entries that did not decode into a source record."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_histogram!("ingest_parse_ms", "Provider parse time in milliseconds.");
    });
}

/// Clean scraped text: decode entities, strip tags, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Line breaks become spaces before tags go away
    static RE_BR: OnceCell<regex::Regex> = OnceCell::new();
    let re_br = RE_BR.get_or_init(|| regex::Regex::new(r"(?i)<br\s*/?>|</p>").expect("br regex"));
    out = re_br.replace_all(&out, " ").to_string();

    // 3) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Parse a spider dump: either a bare JSON array of records or an envelope
/// `{ "<collections|articles|videos>": [...], "fetched_at": "..." }`.
///
/// The envelope's `fetched_at` is stamped onto records lacking their own.
/// Entries that do not decode are skipped.
pub fn parse_dump<R: SourceRecord>(json: &str) -> Result<SourceBatch<R>> {
    let root: Value = serde_json::from_str(json).context("parsing dump json")?;
    parse_dump_value(root)
}

pub fn parse_dump_value<R: SourceRecord>(root: Value) -> Result<SourceBatch<R>> {
    ensure_metrics_described();

    let (list, fetched_at) = match root {
        Value::Array(list) => (list, None),
        Value::Object(mut obj) => {
            let fetched_at = obj
                .get("fetched_at")
                .and_then(Value::as_str)
                .map(str::to_string);
            let list = DUMP_LIST_KEYS
                .iter()
                .find_map(|k| match obj.remove(*k) {
                    Some(Value::Array(list)) => Some(list),
                    _ => None,
                })
                .ok_or_else(|| anyhow!("dump has no record list ({})", DUMP_LIST_KEYS.join("|")))?;
            (list, fetched_at)
        }
        _ => return Err(anyhow!("dump must be a JSON array or object")),
    };

    let mut records = Vec::with_capacity(list.len());
    let mut rejected = 0usize;
    for mut entry in list {
        resolve_timestamp_alias::<R>(&mut entry);
        if let (Some(ts), Some(obj)) = (fetched_at.as_deref(), entry.as_object_mut()) {
            let missing = obj.get("fetched_at").map_or(true, Value::is_null);
            if missing {
                obj.insert("fetched_at".into(), Value::String(ts.to_string()));
            }
        }
        match serde_json::from_value::<R>(entry) {
            Ok(r) => records.push(r),
            Err(e) => {
                rejected += 1;
                tracing::warn!(error = %e, platform = R::PLATFORM.as_str(), "dump entry rejected");
            }
        }
    }

    counter!("ingest_records_total", "platform" => R::PLATFORM.as_str()).increment(records.len() as u64);
    if rejected > 0 {
        counter!("ingest_rejected_total", "platform" => R::PLATFORM.as_str()).increment(rejected as u64);
    }

    Ok(SourceBatch { records, fetched_at })
}

/// Run every provider once against `store`.
///
/// One provider failing never stops the others; each gets its own outcome.
pub async fn run_once(
    providers: &[Box<dyn SourceProvider>],
    store: &dyn RecordStore,
) -> Vec<IngestOutcome> {
    ensure_metrics_described();

    let mut outcomes = Vec::with_capacity(providers.len());
    for p in providers {
        match p.ingest(store).await {
            Ok(report) => {
                tracing::info!(
                    provider = p.name(),
                    written = report.written,
                    unchanged = report.unchanged,
                    failed = report.failed,
                    "provider ingested"
                );
                outcomes.push(IngestOutcome::ok(p.name(), report));
            }
            Err(e) => {
                tracing::warn!(error = ?e, provider = p.name(), "provider error");
                counter!("ingest_provider_errors_total").increment(1);
                outcomes.push(IngestOutcome::err(p.name(), format!("{e:#}")));
            }
        }
    }
    outcomes
}
