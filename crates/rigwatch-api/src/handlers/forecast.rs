//! Forecast proxy handler

use axum::extract::State;
use axum::Json;
use rigwatch_engine::forecast_or_empty;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/predict
/// Forward a numeric series to the forecast service.
///
/// Accepts `{ "values": [...] }` or a bare array. Returns an empty array when
/// no forecast is available.
pub async fn predict(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Vec<f64>>, ApiError> {
    let items = match &body {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("values") {
            Some(Value::Array(items)) => items,
            _ => return Err(ApiError::BadRequest("values must be an array".to_string())),
        },
        _ => return Err(ApiError::BadRequest("values must be an array".to_string())),
    };

    let series = items
        .iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| ApiError::BadRequest(format!("non-numeric value: {}", v)))
        })
        .collect::<Result<Vec<f64>, ApiError>>()?;

    Ok(Json(forecast_or_empty(state.forecaster(), &series).await))
}
