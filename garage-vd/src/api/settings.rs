//! Provider credential settings
//!
//! - `GET /api/settings/provider-keys` lists which credentials are stored
//! - `POST /api/settings/provider-keys/:setting` stores one credential
//!
//! Stored credentials take effect when the service next starts.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::db::settings::{configured_provider_keys, is_provider_key_setting, set_provider_key};
use crate::{ApiError, ApiResult, AppState};

/// Request payload for setting a provider credential
#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

/// Response payload for credential configuration
#[derive(Debug, Serialize)]
pub struct SetApiKeyResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ConfiguredKeysResponse {
    /// Settings names holding a value; values are never returned
    pub configured: Vec<String>,
}

/// POST /api/settings/provider-keys/:setting
///
/// **Request:** `{"api_key": "..."}`
///
/// **Behavior:**
/// 1. Validate setting name and key (non-empty, non-whitespace)
/// 2. Write to database (authoritative)
/// 3. Sync to TOML (best-effort backup)
///
/// **Errors:**
/// - 400 Bad Request: unknown setting, or empty key
/// - 500 Internal Server Error: database write failure
pub async fn set_provider_api_key(
    State(state): State<AppState>,
    Path(setting): Path<String>,
    Json(payload): Json<SetApiKeyRequest>,
) -> ApiResult<Json<SetApiKeyResponse>> {
    if !is_provider_key_setting(&setting) {
        return Err(ApiError::BadRequest(format!("Unknown provider key setting '{}'", setting)));
    }
    if !crate::config::is_valid_key(&payload.api_key) {
        return Err(ApiError::BadRequest(
            "API key cannot be empty or whitespace-only".to_string(),
        ));
    }

    set_provider_key(&state.db, &setting, payload.api_key.clone())
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save API key to database: {}", e)))?;

    info!(setting = %setting, "Provider credential configured via API");

    if let Some(toml_path) = &state.toml_path {
        let mut settings = HashMap::new();
        settings.insert(setting.clone(), payload.api_key);
        if let Err(e) = crate::config::sync_settings_to_toml(settings, toml_path).await {
            warn!("TOML sync failed (database write succeeded): {}", e);
        }
    }

    Ok(Json(SetApiKeyResponse {
        success: true,
        message: format!("{} configured; restart to apply", setting),
    }))
}

/// GET /api/settings/provider-keys
pub async fn list_provider_keys(State(state): State<AppState>) -> ApiResult<Json<ConfiguredKeysResponse>> {
    let configured = configured_provider_keys(&state.db).await?;
    Ok(Json(ConfiguredKeysResponse { configured }))
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/api/settings/provider-keys", get(list_provider_keys))
        .route("/api/settings/provider-keys/:setting", post(set_provider_api_key))
}
