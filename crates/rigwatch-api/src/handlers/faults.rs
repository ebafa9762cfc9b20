//! Fault lifecycle handlers

use axum::extract::{Query, State};
use axum::Json;
use rigwatch_core::{ActiveFault, FaultEvent, FaultSeverity, HistoryRecord, RawSnapshot};
use rigwatch_engine::FaultTransition;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::parse_body;
use crate::error::ApiError;
use crate::state::AppState;

/// Fault as reported by a client
#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub sensor: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogErrorRequest {
    pub error_detail: ErrorDetail,
    pub full_snapshot: Value,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogErrorResponse {
    pub success: bool,
    pub transition: FaultTransition,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveErrorRequest {
    pub error_code: String,
    pub full_snapshot: Value,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveErrorResponse {
    pub success: bool,
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<HistoryRecord>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DeviceQuery {
    pub device: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct HistoryQuery {
    pub device: Option<String>,
    pub limit: Option<usize>,
}

fn snapshot_from(value: &Value) -> Result<RawSnapshot, ApiError> {
    RawSnapshot::from_json(value)
        .ok_or_else(|| ApiError::BadRequest("fullSnapshot must be a JSON object".to_string()))
}

fn required(code: &str) -> Result<&str, ApiError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ApiError::BadRequest("Fault code must not be empty".to_string()));
    }
    Ok(code)
}

/// POST /api/log-error
/// Open or refresh a fault episode
pub async fn log_error(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<LogErrorResponse>, ApiError> {
    let request: LogErrorRequest = parse_body(body)?;
    let code = required(&request.error_detail.code)?.to_string();
    let snapshot = snapshot_from(&request.full_snapshot)?;
    let device_id = state.device_or_default(request.device_id);

    // Unreported fields come from the rule table when the code is known
    let known = state.knowledge().spec_for(&code);
    let detail = request.error_detail;
    let event = FaultEvent {
        code: code.to_string(),
        message: detail
            .msg
            .or_else(|| known.map(|(_, spec)| spec.message.clone()))
            .unwrap_or_default(),
        sensor_channel: detail
            .sensor
            .or_else(|| known.map(|(rule, _)| rule.channel.clone()))
            .unwrap_or_default(),
        value: detail.value.unwrap_or(0.0),
        severity: known
            .map(|(_, spec)| spec.severity)
            .unwrap_or(FaultSeverity::Error),
    };

    let outcome = state
        .tracker()
        .log_error(&device_id, &event, &snapshot)
        .await?;

    Ok(Json(LogErrorResponse {
        success: true,
        transition: outcome.transition,
    }))
}

/// POST /api/resolve-error
/// Close a fault episode and move it to history
pub async fn resolve_error(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ResolveErrorResponse>, ApiError> {
    let request: ResolveErrorRequest = parse_body(body)?;
    let code = required(&request.error_code)?;
    let snapshot = snapshot_from(&request.full_snapshot)?;
    let device_id = state.device_or_default(request.device_id);

    let record = state
        .tracker()
        .resolve_error(&device_id, code, &snapshot)
        .await?;

    Ok(Json(ResolveErrorResponse {
        success: true,
        resolved: record.is_some(),
        record,
    }))
}

/// GET /api/active-errors
/// List open fault episodes, oldest first
pub async fn active_errors(
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
) -> Result<Json<Vec<ActiveFault>>, ApiError> {
    let faults = state
        .tracker()
        .list_active_faults(query.device.as_deref())
        .await?;
    Ok(Json(faults))
}

/// GET /api/error-history
/// List resolved fault episodes, most recent first
pub async fn error_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    let history = state
        .tracker()
        .list_history(query.device.as_deref(), query.limit)
        .await?;
    Ok(Json(history))
}
