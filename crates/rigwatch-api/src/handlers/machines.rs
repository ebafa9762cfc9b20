//! Machine state handlers

use axum::extract::{Path, State};
use axum::Json;
use rigwatch_engine::LatestSnapshot;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/machines
/// Devices that have reported telemetry since startup
pub async fn list_machines(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.monitor().devices())
}

/// GET /api/machines/{device}/latest
/// Most recent snapshot with conditioned values and metric summaries
pub async fn latest(
    State(state): State<AppState>,
    Path(device): Path<String>,
) -> Result<Json<LatestSnapshot>, ApiError> {
    Ok(Json(state.latest(&device)?))
}
