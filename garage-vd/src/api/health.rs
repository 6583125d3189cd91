//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use garage_common::time::{month_key, now};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the database does not answer
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    /// Short commit hash captured at build time
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub uptime_seconds: u64,
    /// Provider spend recorded for the current month
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month_spend: Option<f64>,
    /// Most recent aggregation failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = (now() - state.startup_time).num_seconds().max(0) as u64;

    // Doubles as the database liveness probe
    let month_spend: Option<f64> = sqlx::query_scalar(
        "SELECT CAST(COALESCE(SUM(current_spend), 0) AS REAL) FROM api_budget_tracking WHERE month = ?",
    )
    .bind(month_key(now()))
    .fetch_one(&state.db)
    .await
    .ok();

    Json(HealthResponse {
        status: if month_spend.is_some() { "ok" } else { "degraded" },
        module: "garage-vd",
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        uptime_seconds,
        month_spend,
        last_error: state.last_error.read().await.clone(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
