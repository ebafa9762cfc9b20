//! HTTP handlers

pub mod faults;
pub mod forecast;
pub mod machines;
pub mod maintenance;
pub mod sensor_data;
pub mod telemetry;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Decode a JSON body, reporting shape errors as 400
pub(crate) fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
}
