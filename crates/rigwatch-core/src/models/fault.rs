//! Fault models: detections, open episodes and resolved history

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snapshot::RawSnapshot;

/// Fault severity levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultSeverity {
    /// Informational only
    Info,
    /// Warning condition
    Warning,
    /// Error condition
    #[default]
    Error,
    /// Critical failure
    Critical,
}

/// A single fault detection produced by one evaluation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultEvent {
    /// Unique fault code, e.g. "E03" or "CA452"
    pub code: String,
    pub message: String,
    pub sensor_channel: String,
    /// Physical reading at detection time
    pub value: f64,
    #[serde(default)]
    pub severity: FaultSeverity,
}

/// Result of one evaluation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub errors: Vec<FaultEvent>,
    /// Advisory messages that do not open a fault
    pub predictions: Vec<String>,
}

impl Diagnosis {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.predictions.is_empty()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    pub fn codes(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.code.as_str()).collect()
    }
}

/// An open fault episode. At most one exists per device and code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveFault {
    pub device_id: String,
    pub code: String,
    pub message: String,
    pub sensor_channel: String,
    /// Physical reading at first detection
    #[serde(default)]
    pub value_at_start: f64,
    #[serde(with = "ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub last_seen_at: DateTime<Utc>,
    pub snapshot_at_start: RawSnapshot,
}

/// A resolved fault episode. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Store-assigned key; empty until persisted
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub device_id: String,
    pub code: String,
    pub message: String,
    pub sensor_channel: String,
    #[serde(with = "ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub first_snapshot: RawSnapshot,
    pub last_snapshot: RawSnapshot,
}

impl HistoryRecord {
    /// Close an active episode at `ended_at`
    pub fn close(active: ActiveFault, ended_at: DateTime<Utc>, last_snapshot: RawSnapshot) -> Self {
        let duration_seconds =
            (ended_at - active.started_at).num_milliseconds() as f64 / 1000.0;
        Self {
            id: String::new(),
            device_id: active.device_id,
            code: active.code,
            message: active.message,
            sensor_channel: active.sensor_channel,
            started_at: active.started_at,
            ended_at,
            duration_seconds,
            first_snapshot: active.snapshot_at_start,
            last_snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn active(started_at: DateTime<Utc>) -> ActiveFault {
        ActiveFault {
            device_id: "komatsu".into(),
            code: "E03".into(),
            message: "Engine coolant overheat".into(),
            sensor_channel: "eng_wtr_temp".into(),
            value_at_start: 120.0,
            started_at,
            last_seen_at: started_at,
            snapshot_at_start: RawSnapshot::new().with("eng_wtr_temp", 105.0),
        }
    }

    #[test]
    fn test_close_computes_duration() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let end = start + Duration::milliseconds(95_500);
        let last = RawSnapshot::new().with("eng_wtr_temp", 60.0);

        let record = HistoryRecord::close(active(start), end, last.clone());
        assert_eq!(record.duration_seconds, 95.5);
        assert_eq!(record.started_at, start);
        assert_eq!(record.ended_at, end);
        assert_eq!(record.first_snapshot.get("eng_wtr_temp"), Some(105.0));
        assert_eq!(record.last_snapshot, last);
    }

    #[test]
    fn test_timestamps_serialize_as_millis() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let value = serde_json::to_value(active(start)).unwrap();
        assert_eq!(value["startedAt"], json!(start.timestamp_millis()));
        assert_eq!(value["sensorChannel"], json!("eng_wtr_temp"));

        let back: ActiveFault = serde_json::from_value(value).unwrap();
        assert_eq!(back.started_at, start);
    }

    #[test]
    fn test_history_id_omitted_until_persisted() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let record = HistoryRecord::close(active(start), start, RawSnapshot::new());
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("id").is_none());
    }
}
