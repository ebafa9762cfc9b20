//! Engine configuration
//!
//! Deserialized from the `[diagnostics]` and `[forecast]` sections of the
//! daemon's TOML file. Every field has a default so an empty section is valid.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the diagnostic engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Device id used when a telemetry message does not name one
    pub device_id: String,
    /// Minimum spacing between `machine_logs` writes per device
    pub snapshot_interval_secs: u64,
    /// Upper bound for any single store call
    pub store_timeout_ms: u64,
    /// Maximum number of history records returned by one query
    pub history_limit: usize,
    /// Maximum number of distinct devices tracked; telemetry from further
    /// devices is dropped
    pub max_devices: usize,
    /// Rule table file; the built-in table is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device_id: "komatsu".to_string(),
            snapshot_interval_secs: 10,
            store_timeout_ms: 2000,
            history_limit: 200,
            max_devices: 1000,
            rules: None,
        }
    }
}

impl EngineConfig {
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Configuration for the external forecast service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Prediction endpoint (e.g. "http://127.0.0.1:5005/predict"); disabled when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: 5000,
        }
    }
}

impl ForecastConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
