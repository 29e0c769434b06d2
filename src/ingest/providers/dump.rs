use std::marker::PhantomData;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::ingest::parse_dump;
use crate::ingest::types::{SourceBatch, SourceProvider};
use crate::store::{save_batch, RecordStore, SaveReport};
use crate::timeline::sources::SourceRecord;

/// JSON dump written by one of the platform spiders.
pub struct DumpProvider<R> {
    mode: Mode,
    _record: PhantomData<fn() -> R>,
}

enum Mode {
    Inline(String),
    File(PathBuf),
}

impl<R: SourceRecord> DumpProvider<R> {
    pub fn from_json_str(s: &str) -> Self {
        Self {
            mode: Mode::Inline(s.to_string()),
            _record: PhantomData,
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            mode: Mode::File(path.into()),
            _record: PhantomData,
        }
    }

    pub fn fetch_batch(&self) -> Result<SourceBatch<R>> {
        match &self.mode {
            Mode::Inline(s) => parse_dump(s),
            Mode::File(p) => {
                let s = std::fs::read_to_string(p)
                    .with_context(|| format!("reading dump from {}", p.display()))?;
                parse_dump(&s).with_context(|| format!("dump {}", p.display()))
            }
        }
    }
}

#[async_trait]
impl<R: SourceRecord> SourceProvider for DumpProvider<R> {
    async fn ingest(&self, store: &dyn RecordStore) -> Result<SaveReport> {
        let batch = self.fetch_batch()?;
        Ok(save_batch(store, &batch.records).await)
    }

    fn name(&self) -> &'static str {
        R::PLATFORM.as_str()
    }
}
