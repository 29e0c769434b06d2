use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use shuttle_axum::axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::engine;
use crate::ingest::parse_dump_value;
use crate::store::{self, save_batch, RecordStore, SaveReport};
use crate::timeline::group::{group_by_date, DateGroup};
use crate::timeline::sources::{BilibiliVideo, DoubanRssItem, JianshuArticle, SourceRecord, YouTubeVideo};
use crate::timeline::{Platform, TimelineItem};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, config: AppConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/timeline", get(timeline))
        .route("/timeline/grouped", get(timeline_grouped))
        .route("/data/{source}", get(source_data))
        .route("/ingest/{source}", post(ingest_source))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Error body shape shared by every handler: `{ "error": "..." }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unknown_source(source: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("unknown source: {source}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Path segment → platform. The RSS source is exposed as plain `douban`.
fn source_platform(source: &str) -> Option<Platform> {
    match source.to_ascii_lowercase().as_str() {
        "douban" | "douban-rss" => Some(Platform::DoubanRss),
        "jianshu" => Some(Platform::Jianshu),
        "bilibili" => Some(Platform::Bilibili),
        "youtube" => Some(Platform::YouTube),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    #[serde(default)]
    limit: Option<u32>,
}

impl LimitQuery {
    fn resolve(&self, cfg: &AppConfig) -> u32 {
        match self.limit {
            Some(n) if n > 0 => n,
            _ => cfg.recent_limit,
        }
    }
}

async fn timeline(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Json<Vec<TimelineItem>> {
    let limit = q.resolve(&state.config);
    let items = engine::build_timeline(state.store.as_ref(), limit, Utc::now()).await;
    Json(items)
}

async fn timeline_grouped(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Json<Vec<DateGroup>> {
    let limit = q.resolve(&state.config);
    let items = engine::build_timeline(state.store.as_ref(), limit, Utc::now()).await;
    Json(group_by_date(items, state.config.utc_offset()))
}

async fn source_data(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let platform = source_platform(&source).ok_or_else(|| ApiError::unknown_source(&source))?;
    let limit = q.resolve(&state.config);
    let store = state.store.as_ref();
    let loaded = match platform {
        Platform::DoubanRss | Platform::Douban => store::load_recent_json::<DoubanRssItem>(store, limit).await,
        Platform::Jianshu => store::load_recent_json::<JianshuArticle>(store, limit).await,
        Platform::Bilibili => store::load_recent_json::<BilibiliVideo>(store, limit).await,
        Platform::YouTube => store::load_recent_json::<YouTubeVideo>(store, limit).await,
    };
    loaded.map(Json).map_err(|e| {
        tracing::warn!(error = ?e, %source, "reading source data failed");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "failed to read source data")
    })
}

async fn ingest_source(
    State(state): State<AppState>,
    Path(source): Path<String>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SaveReport>, ApiError> {
    authorize(&headers, state.config.ingest_secret.as_deref())?;
    let Json(body) = body.map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.body_text()))?;
    let platform = source_platform(&source).ok_or_else(|| ApiError::unknown_source(&source))?;
    let store = state.store.as_ref();
    let report = match platform {
        Platform::DoubanRss | Platform::Douban => ingest_body::<DoubanRssItem>(store, body).await?,
        Platform::Jianshu => ingest_body::<JianshuArticle>(store, body).await?,
        Platform::Bilibili => ingest_body::<BilibiliVideo>(store, body).await?,
        Platform::YouTube => ingest_body::<YouTubeVideo>(store, body).await?,
    };
    Ok(Json(report))
}

async fn ingest_body<R: SourceRecord>(store: &dyn RecordStore, body: Value) -> Result<SaveReport, ApiError> {
    let batch = parse_dump_value::<R>(body)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("{e:#}")))?;
    Ok(save_batch(store, &batch.records).await)
}

fn authorize(headers: &HeaderMap, secret: Option<&str>) -> Result<(), ApiError> {
    let Some(secret) = secret else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);
    if presented.is_some_and(|p| tokens_match(p, secret)) {
        Ok(())
    } else {
        Err(ApiError::new(StatusCode::UNAUTHORIZED, "missing or invalid bearer token"))
    }
}

// Fixed-length digests compared without early exit.
fn tokens_match(presented: &str, secret: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(secret.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
