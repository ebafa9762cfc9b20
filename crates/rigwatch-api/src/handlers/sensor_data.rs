//! Sensor time series handler

use axum::extract::{Query, State};
use axum::Json;
use rigwatch_core::{SeriesPeriod, SeriesPoint};
use rigwatch_engine::records;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct SensorDataQuery {
    pub sensor: Option<String>,
    pub period: Option<String>,
    pub device: Option<String>,
}

/// GET /api/sensor-data
/// One channel from the periodic machine logs, oldest first
pub async fn sensor_data(
    State(state): State<AppState>,
    Query(query): Query<SensorDataQuery>,
) -> Result<Json<Vec<SeriesPoint>>, ApiError> {
    let sensor = query
        .sensor
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("sensor query parameter is required".to_string()))?;
    let period = query
        .period
        .as_deref()
        .map(SeriesPeriod::parse)
        .unwrap_or_default();

    let points = records::sensor_series(
        state.store(),
        query.device.as_deref(),
        &sensor,
        period,
        state.clock().now(),
    )
    .await?;
    Ok(Json(points))
}
