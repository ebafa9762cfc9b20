//! Maintenance record handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use rigwatch_core::MaintenanceRecord;
use rigwatch_engine::records;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/maintenance
/// All maintenance records, newest first
pub async fn list_maintenance(
    State(state): State<AppState>,
) -> Result<Json<Vec<MaintenanceRecord>>, ApiError> {
    Ok(Json(records::list_maintenance(state.store()).await?))
}

/// POST /api/maintenance
/// Store a free-form maintenance record
pub async fn add_maintenance(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<MaintenanceRecord>), ApiError> {
    let Value::Object(fields) = body else {
        return Err(ApiError::BadRequest(
            "Maintenance record must be a JSON object".to_string(),
        ));
    };
    let record = records::add_maintenance(state.store(), fields, state.clock().now()).await?;
    tracing::info!(id = %record.id, "Maintenance record added");
    Ok((StatusCode::CREATED, Json(record)))
}
