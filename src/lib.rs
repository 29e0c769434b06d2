// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod metrics;
pub mod store;
pub mod timeline;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
pub use crate::store::{RecordStore, SaveReport, SqliteStore};
pub use crate::timeline::{DateGroup, Platform, TimelineItem};

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Env switch that turns on debug output (e.g. records dropped by the transform).
pub const ENV_DEV_LOG: &str = "ILOG_DEV_LOG";

/// Install compact tracing logs.
///
/// `RUST_LOG` wins when set. Otherwise `ILOG_DEV_LOG=1` selects debug level
/// for this crate. Uses `try_init`, so a subscriber installed by the runtime
/// stays in place.
pub fn init_tracing() {
    let dev_flag = std::env::var(ENV_DEV_LOG).ok().is_some_and(|v| v == "1");
    let default_filter = if dev_flag {
        "ilog_timeline=debug,warn"
    } else {
        "ilog_timeline=info,warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

/// Connect the configured store and build the HTTP router (without `/metrics`).
pub async fn app(config: AppConfig) -> anyhow::Result<shuttle_axum::axum::Router> {
    let store = SqliteStore::connect(&config.database_url).await?;
    tracing::info!(
        database_url = %config.database_url,
        recent_limit = config.recent_limit,
        utc_offset_hours = config.utc_offset_hours,
        ingest_auth = config.ingest_secret.is_some(),
        "store ready"
    );
    Ok(router(AppState::new(Arc::new(store), config)))
}
