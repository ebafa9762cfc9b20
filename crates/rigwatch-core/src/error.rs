//! Common error types for the external collaborators

use thiserror::Error;

/// Result type for document store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for forecast requests
pub type ForecastResult<T> = Result<T, ForecastError>;

/// Errors that can occur in a document store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document not found
    #[error("Document not found: {collection}/{key}")]
    NotFound { collection: String, key: String },

    /// Document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored document does not have the expected shape
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Store is unreachable or refused the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Timeout waiting for the store
    #[error("Store operation timed out")]
    Timeout,
}

impl StoreError {
    pub fn not_found(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::NotFound { .. } => 404,
            StoreError::Serialization(_) => 500,
            StoreError::InvalidDocument(_) => 500,
            StoreError::Unavailable(_) => 503,
            StoreError::Timeout => 504,
        }
    }
}

/// Errors returned by a forecast service
///
/// Callers treat every variant as "no forecast available".
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Request could not be sent or the connection failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Service answered with a non-success status
    #[error("Forecast service error {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body was not a numeric array
    #[error("Malformed forecast response: {0}")]
    Malformed(String),

    /// Timeout waiting for the service
    #[error("Forecast request timed out")]
    Timeout,

    /// No forecast service configured
    #[error("No forecast service configured")]
    Unavailable,
}
