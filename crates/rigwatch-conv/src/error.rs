//! Error types for sensor rule tables

use thiserror::Error;

/// Errors that can occur while loading or validating a rule table
#[derive(Debug, Error)]
pub enum ConvError {
    /// Same fault code defined by more than one rule slot
    #[error("duplicate fault code {code}: defined by {first} and {second}")]
    DuplicateCode {
        code: String,
        first: String,
        second: String,
    },

    /// Rule is missing a threshold its type requires, or is inconsistent
    #[error("invalid rule for channel {channel}: {reason}")]
    InvalidRule { channel: String, reason: String },

    /// YAML parsing error
    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConvError {
    pub fn invalid(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            channel: channel.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for rule table operations
pub type ConvResult<T> = Result<T, ConvError>;
