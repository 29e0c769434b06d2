//! # Record store
//! Idempotent persistence of raw source records.
//!
//! Each record is stored as an opaque JSON payload under its natural key,
//! next to an extracted `published_at` column used for recency ordering.
//! Writing the same batch twice leaves exactly one row per key; writing a
//! changed record replaces the payload in place.

pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value;

use crate::timeline::sources::{resolve_timestamp_alias, SourceRecord};

pub use sqlite::SqliteStore;

/// Default number of records read back per source.
pub const DEFAULT_RECENT_LIMIT: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Row inserted, or an existing row replaced with different content.
    Written,
    /// Existing row already held identical content.
    Unchanged,
}

/// One stored row as read back from a table.
#[derive(Debug, Clone)]
pub struct StoredRow {
    pub id: i64,
    pub payload: Value,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: String,
    pub updated_at: String,
}

/// Per-batch result; partial success is normal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl SaveReport {
    pub fn total(&self) -> usize {
        self.written + self.unchanged + self.failed
    }

    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert-or-replace `payload` under `(table, key)` in one atomic statement.
    async fn upsert(
        &self,
        table: &str,
        key: &str,
        payload: &Value,
        published_at: Option<DateTime<Utc>>,
    ) -> Result<UpsertOutcome>;

    /// Up to `limit` rows, newest `published_at` first (unknown times last).
    async fn load_recent(&self, table: &str, limit: u32) -> Result<Vec<StoredRow>>;
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("store_upsert_written_total", "Records inserted or updated.");
        describe_counter!(
            "store_upsert_unchanged_total",
            "Records already stored with identical content."
        );
        describe_counter!(
            "store_upsert_failed_total",
            "Records that could not be stored (no key or write error)."
        );
    });
}

/// Upsert a batch record by record. A failing record is logged and counted;
/// it never aborts the rest of the batch.
///
/// Records are written sequentially, so two records sharing a natural key in
/// one batch end up as the later one.
pub async fn save_batch<R: SourceRecord>(store: &dyn RecordStore, records: &[R]) -> SaveReport {
    ensure_metrics_described();
    let mut report = SaveReport::default();

    for r in records {
        let Some(key) = r.natural_key() else {
            tracing::warn!(table = R::TABLE, title = ?r.title(), "record has no natural key; skipped");
            report.failed += 1;
            continue;
        };

        let payload = match serde_json::to_value(r) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = ?e, table = R::TABLE, %key, "record not serializable");
                report.failed += 1;
                continue;
            }
        };

        match store
            .upsert(R::TABLE, &key, &payload, r.published_instant())
            .await
        {
            Ok(UpsertOutcome::Written) => report.written += 1,
            Ok(UpsertOutcome::Unchanged) => report.unchanged += 1,
            Err(e) => {
                tracing::warn!(error = ?e, table = R::TABLE, %key, "upsert failed");
                report.failed += 1;
            }
        }
    }

    counter!("store_upsert_written_total").increment(report.written as u64);
    counter!("store_upsert_unchanged_total").increment(report.unchanged as u64);
    counter!("store_upsert_failed_total").increment(report.failed as u64);

    tracing::info!(
        table = R::TABLE,
        written = report.written,
        unchanged = report.unchanged,
        failed = report.failed,
        "batch saved"
    );
    report
}

/// Read back recent records of one source.
///
/// Payloads get the alternate timestamp field resolved. A stored
/// `formattedDate` is kept and passes through to the timeline. Rows that no
/// longer decode are skipped.
pub async fn load_recent<R: SourceRecord>(store: &dyn RecordStore, limit: u32) -> Result<Vec<R>> {
    let rows = load_recent_payloads::<R>(store, limit).await?;
    let mut out = Vec::with_capacity(rows.len());
    for (id, payload) in rows {
        match serde_json::from_value::<R>(payload) {
            Ok(r) => out.push(r),
            Err(e) => tracing::warn!(error = ?e, table = R::TABLE, row = id, "stored payload does not decode"),
        }
    }
    Ok(out)
}

/// Like [`load_recent`] but keeps the normalized JSON payloads.
pub async fn load_recent_json<R: SourceRecord>(store: &dyn RecordStore, limit: u32) -> Result<Vec<Value>> {
    Ok(load_recent_payloads::<R>(store, limit)
        .await?
        .into_iter()
        .map(|(_, v)| v)
        .collect())
}

async fn load_recent_payloads<R: SourceRecord>(
    store: &dyn RecordStore,
    limit: u32,
) -> Result<Vec<(i64, Value)>> {
    let limit = if limit == 0 { DEFAULT_RECENT_LIMIT } else { limit };
    let rows = store.load_recent(R::TABLE, limit).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let mut payload = row.payload;
            resolve_timestamp_alias::<R>(&mut payload);
            (row.id, payload)
        })
        .collect())
}
