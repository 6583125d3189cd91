//! Vehicle data endpoints
//!
//! - `POST /api/vehicle-data` runs an aggregation
//! - `GET /api/vehicle-data/:registration` returns the stored record

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use crate::models::{normalize_registration, AggregationRequest, AggregationResult, VehicleRecord};
use crate::{ApiError, ApiResult, AppState};

fn validated_registration(input: &str) -> ApiResult<String> {
    normalize_registration(input).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid registration '{}': expected 1-8 letters or digits",
            input
        ))
    })
}

/// POST /api/vehicle-data
///
/// **Request:** `{"registration": "AB12 CDE", "dataTypes": ["basic", "mot"],
/// "forceRefresh": false, "comprehensive": false}`
///
/// **Errors:**
/// - 400 Bad Request: invalid registration or empty `dataTypes`
/// - 500 Internal Server Error: database failure
pub async fn aggregate_vehicle_data(
    State(state): State<AppState>,
    Json(mut request): Json<AggregationRequest>,
) -> ApiResult<Json<AggregationResult>> {
    request.registration = validated_registration(&request.registration)?;
    if request.data_types.is_empty() {
        return Err(ApiError::BadRequest("dataTypes must not be empty".to_string()));
    }

    match state.aggregator.aggregate(request).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            state.record_error(&e).await;
            Err(e.into())
        }
    }
}

/// GET /api/vehicle-data/:registration
pub async fn get_vehicle(
    State(state): State<AppState>,
    Path(registration): Path<String>,
) -> ApiResult<Json<VehicleRecord>> {
    let registration = validated_registration(&registration)?;

    let record = crate::db::vehicles::load_vehicle(&state.db, &registration).await?;
    match record {
        Some(record) => {
            info!(registration = %registration, "Vehicle record served");
            Ok(Json(record))
        }
        None => Err(ApiError::NotFound(format!("No vehicle data for {}", registration))),
    }
}

/// Build vehicle data routes
pub fn vehicle_data_routes() -> Router<AppState> {
    Router::new()
        .route("/api/vehicle-data", post(aggregate_vehicle_data))
        .route("/api/vehicle-data/:registration", get(get_vehicle))
}
