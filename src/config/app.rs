// src/config/app.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

use crate::store::DEFAULT_RECENT_LIMIT;

pub const ENV_CONFIG_PATH: &str = "ILOG_CONFIG_PATH";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_INGEST_SECRET: &str = "ILOG_INGEST_SECRET";

const DEFAULT_TOML_PATH: &str = "config/ilog.toml";
const DEFAULT_JSON_PATH: &str = "config/ilog.json";

fn default_database_url() -> String {
    "sqlite://data/ilog.db?mode=rwc".to_string()
}
fn default_recent_limit() -> u32 {
    DEFAULT_RECENT_LIMIT
}
fn default_utc_offset_hours() -> i32 {
    8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Records read back per source when building the timeline.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: u32,
    /// Offset used to bucket the grouped timeline by calendar day.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    /// Bearer token for POST /ingest. "ENV" means: read ILOG_INGEST_SECRET.
    #[serde(default, skip_serializing)]
    pub ingest_secret: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            recent_limit: default_recent_limit(),
            utc_offset_hours: default_utc_offset_hours(),
            ingest_secret: None,
        }
    }
}

impl AppConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.finish()
    }

    /// Load using env var + fallbacks:
    /// 1) $ILOG_CONFIG_PATH
    /// 2) config/ilog.toml
    /// 3) config/ilog.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            bail!("{ENV_CONFIG_PATH} points to non-existent path");
        }
        let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from(DEFAULT_JSON_PATH);
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Self::default().finish()
    }

    /// Offset as a chrono value.
    pub fn utc_offset(&self) -> chrono::FixedOffset {
        crate::timeline::group::offset_from_hours(self.utc_offset_hours)
    }

    // Env overrides, secret resolution, range sanitizing.
    fn finish(mut self) -> Result<Self> {
        if let Ok(url) = env::var(ENV_DATABASE_URL) {
            if !url.trim().is_empty() {
                self.database_url = url.trim().to_string();
            }
        }

        let from_env = env::var(ENV_INGEST_SECRET)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self.ingest_secret = match self.ingest_secret.as_deref().map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("env") => Some(
                from_env.ok_or_else(|| anyhow!("Missing {ENV_INGEST_SECRET} env var"))?,
            ),
            Some("") | None => from_env,
            Some(s) => Some(s.to_string()),
        };

        if self.recent_limit == 0 {
            self.recent_limit = default_recent_limit();
        }
        self.utc_offset_hours = self.utc_offset_hours.clamp(-12, 14);

        Ok(self)
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig> {
    match hint_ext {
        "toml" => Ok(toml::from_str(s)?),
        "json" => Ok(serde_json::from_str(s)?),
        _ => {
            if let Ok(v) = serde_json::from_str(s) {
                return Ok(v);
            }
            toml::from_str(s).map_err(|e| anyhow!("unsupported config format: {e}"))
        }
    }
}
