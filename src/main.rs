//! Timeline Service: Binary Entrypoint
//! Boots the Axum HTTP server: config, record store, routes and `/metrics`.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;

use ilog_timeline::metrics::Metrics;
use ilog_timeline::AppConfig;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    ilog_timeline::init_tracing();

    let config = AppConfig::load_default().context("loading app config")?;
    let metrics = Metrics::init()?;

    let router = ilog_timeline::app(config)
        .await
        .context("building app")?
        .merge(metrics.router());

    Ok(router.into())
}
