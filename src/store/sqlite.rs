//! SQLite-backed [`RecordStore`].
//!
//! One table per source, identical layout. The natural key carries a UNIQUE
//! constraint so every write is a single `INSERT ... ON CONFLICT DO UPDATE`;
//! there is no separate existence check to race against.

use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;

use super::{RecordStore, StoredRow, UpsertOutcome};
use crate::timeline::sources::{BilibiliVideo, DoubanRssItem, JianshuArticle, SourceRecord, YouTubeVideo};

/// Every table the store manages. Table names are interpolated into SQL,
/// so anything outside this list is rejected.
pub const TABLES: [&str; 4] = [
    BilibiliVideo::TABLE,
    JianshuArticle::TABLE,
    YouTubeVideo::TABLE,
    DoubanRssItem::TABLE,
];

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and ensure the schema.
    ///
    /// `url` is a sqlx SQLite URL such as `sqlite://data/ilog.db?mode=rwc`.
    pub async fn connect(url: &str) -> Result<Self> {
        if let Some(path) = file_path_of(url) {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating database dir {}", parent.display()))?;
                }
            }
        }

        let opts = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("parsing database url {url}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .with_context(|| format!("connecting to {url}"))?;

        sqlx::query("PRAGMA busy_timeout = 5000")
            .execute(&pool)
            .await?;

        let store = Self { pool };
        store.init_tables().await?;
        info!(%url, "record store ready");
        Ok(store)
    }

    /// Private in-memory database. A single connection, because every
    /// `:memory:` connection would otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("opening in-memory sqlite")?;
        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables and indexes (idempotent).
    pub async fn init_tables(&self) -> Result<()> {
        for table in TABLES {
            let create = format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    natural_key TEXT NOT NULL UNIQUE,
                    payload TEXT NOT NULL,
                    published_at TEXT,
                    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                )
                "#
            );
            sqlx::query(&create)
                .execute(&self.pool)
                .await
                .with_context(|| format!("creating table {table}"))?;

            let index = format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_published_at ON {table} (published_at DESC)"
            );
            sqlx::query(&index).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Number of rows in `table`.
    pub async fn count(&self, table: &str) -> Result<i64> {
        let table = checked_table(table)?;
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn upsert(
        &self,
        table: &str,
        key: &str,
        payload: &Value,
        published_at: Option<DateTime<Utc>>,
    ) -> Result<UpsertOutcome> {
        let table = checked_table(table)?;
        let payload_text = serde_json::to_string(payload)?;
        let published = published_at.map(|ts| column_instant(&ts));

        // The WHERE clause turns an identical re-write into a no-op (0 rows).
        let sql = format!(
            r#"
            INSERT INTO {table} (natural_key, payload, published_at, created_at, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            ON CONFLICT(natural_key) DO UPDATE SET
                payload = excluded.payload,
                published_at = excluded.published_at,
                updated_at = CURRENT_TIMESTAMP
            WHERE {table}.payload IS NOT excluded.payload
               OR {table}.published_at IS NOT excluded.published_at
            "#
        );

        let res = sqlx::query(&sql)
            .bind(key)
            .bind(payload_text)
            .bind(published)
            .execute(&self.pool)
            .await
            .with_context(|| format!("upserting into {table}"))?;

        Ok(if res.rows_affected() == 0 {
            UpsertOutcome::Unchanged
        } else {
            UpsertOutcome::Written
        })
    }

    async fn load_recent(&self, table: &str, limit: u32) -> Result<Vec<StoredRow>> {
        let table = checked_table(table)?;
        // SQLite sorts NULL lowest, so DESC puts unknown times last.
        let sql = format!(
            r#"
            SELECT id, payload, published_at, created_at, updated_at
            FROM {table}
            ORDER BY published_at DESC, id DESC
            LIMIT ?
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("reading {table}"))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let raw: String = row.try_get("payload")?;
            let payload = match serde_json::from_str::<Value>(&raw) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = ?e, %table, row = id, "corrupt payload skipped");
                    continue;
                }
            };
            let published_at = row
                .try_get::<Option<String>, _>("published_at")?
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc));

            out.push(StoredRow {
                id,
                payload,
                published_at,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            });
        }
        Ok(out)
    }
}

fn checked_table(table: &str) -> Result<&str> {
    if TABLES.contains(&table) {
        Ok(table)
    } else {
        bail!("unknown table `{table}`")
    }
}

/// Fixed-width UTC text so lexical order equals chronological order.
fn column_instant(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn file_path_of(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(path)
    }
}
