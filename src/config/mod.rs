// src/config/mod.rs
pub mod app;

pub use app::{AppConfig, ENV_CONFIG_PATH, ENV_DATABASE_URL, ENV_INGEST_SECRET};
