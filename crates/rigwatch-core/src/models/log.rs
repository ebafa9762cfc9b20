//! Periodic machine log models (forecast input)

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snapshot::RawSnapshot;

/// A raw snapshot written to the `machine_logs` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineLogEntry {
    pub device_id: String,
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: RawSnapshot,
}

/// One point of a single-channel time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Look-back window for series queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesPeriod {
    #[default]
    #[serde(rename = "1h")]
    LastHour,
    #[serde(rename = "24h")]
    LastDay,
    #[serde(rename = "7d")]
    LastWeek,
}

impl SeriesPeriod {
    /// Parse a period name; anything unrecognized means the last hour
    pub fn parse(s: &str) -> Self {
        match s {
            "24h" => SeriesPeriod::LastDay,
            "7d" => SeriesPeriod::LastWeek,
            _ => SeriesPeriod::LastHour,
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        match self {
            SeriesPeriod::LastHour => chrono::Duration::hours(1),
            SeriesPeriod::LastDay => chrono::Duration::hours(24),
            SeriesPeriod::LastWeek => chrono::Duration::days(7),
        }
    }
}
