//! Engine errors

use thiserror::Error;

/// Result type for telemetry ingestion
pub type IngestResult<T> = Result<T, IngestError>;

/// Reasons a telemetry message is dropped
#[derive(Debug, Error)]
pub enum IngestError {
    /// Payload is not valid JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary payload is not UTF-8
    #[error("payload is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Payload is JSON but not an object
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// Object carries no sensor readings
    #[error("payload carries no sensor readings")]
    NoReadings,
}
