// src/ingest/types.rs
use anyhow::Result;
use serde::Serialize;

use crate::store::{RecordStore, SaveReport};

/// Records of one source as handed over by an upstream fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBatch<R> {
    pub records: Vec<R>,
    /// When the upstream fetcher produced the batch, if it said so.
    pub fetched_at: Option<String>,
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    /// Produce one batch and upsert it into `store`.
    async fn ingest(&self, store: &dyn RecordStore) -> Result<SaveReport>;
    fn name(&self) -> &'static str;
}

/// Result of one provider within an ingest run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub provider: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SaveReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestOutcome {
    pub fn ok(provider: &'static str, report: SaveReport) -> Self {
        Self {
            provider,
            success: true,
            report: Some(report),
            error: None,
        }
    }

    pub fn err(provider: &'static str, error: String) -> Self {
        Self {
            provider,
            success: false,
            report: None,
            error: Some(error),
        }
    }
}
