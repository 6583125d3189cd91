//! garage-vd library interface
//!
//! Vehicle data aggregation for the garage dashboard: cache-first lookups
//! across free government APIs and paid vendors, with per-call cost
//! accounting. Exposes the aggregator and router for the binary and for
//! integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sources;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::VehicleDataAggregator;

/// Default HTTP listen address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5810";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub aggregator: Arc<VehicleDataAggregator>,
    /// TOML file credentials are mirrored to, if any
    pub toml_path: Option<PathBuf>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, aggregator: Arc<VehicleDataAggregator>) -> Self {
        Self {
            db,
            aggregator,
            toml_path: None,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_toml_path(mut self, path: Option<PathBuf>) -> Self {
        self.toml_path = path;
        self
    }

    /// Remember a failure for the health endpoint
    pub async fn record_error(&self, error: &garage_common::Error) {
        *self.last_error.write().await = Some(error.to_string());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::vehicle_data_routes())
        .merge(api::usage_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
