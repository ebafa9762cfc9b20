//! Telemetry snapshot models

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Channel names reported by the machine's telemetry link
pub mod channels {
    pub const RAD_WTR_LVL: &str = "rad_wtr_lvl";
    pub const CRANK_SEN: &str = "crank_sen";
    pub const CAM_SEN: &str = "cam_sen";
    pub const AIR_CLN_CLD: &str = "air_cln_cld";
    pub const WTR_IN_FUEL: &str = "wtr_in_fuel";
    pub const ENG_OIL_LVL: &str = "eng_oil_lvl";
    pub const ENG_WTR_TEMP: &str = "eng_wtr_temp";
    pub const BOOST_PRS: &str = "boost_prs";
    pub const RAIL_PRS: &str = "rail_prs";
    pub const FUEL_LVL: &str = "fuel_lvl";
    pub const HYD_OIL_TEMP: &str = "hyd_oil_temp";
    pub const REAR_PUMP_PRS: &str = "rear_pump_prs";
    pub const FRONT_PUMP_PRS: &str = "front_pump_prs";
    pub const ARM_DUMP_PRS: &str = "arm_dump_prs";
    pub const ARM_DIG_PRS: &str = "arm_dig_prs";
    pub const BUCKET_DUMP_PRS: &str = "bucket_dump_prs";
    pub const BUCKET_DIG_PRS: &str = "bucket_dig_prs";
    pub const BOOM_UP_PRS: &str = "boom_up_prs";
    pub const BOOM_DOWN_PRS: &str = "boom_down_prs";
    pub const SWING_LEFT_PRS: &str = "swing_left_prs";
    pub const SWING_RIGHT_PRS: &str = "swing_right_prs";
    pub const AC_AMB_TEMP: &str = "ac_amb_temp";
    pub const SUNSHINE_SEN: &str = "sunshine_sen";
    pub const AMB_AIR_PRS: &str = "amb_air_prs";
    pub const TRAVEL_LF_PRS: &str = "travel_lf_prs";
    pub const TRAVEL_LR_PRS: &str = "travel_lr_prs";
    pub const TRAVEL_RF_PRS: &str = "travel_rf_prs";
    pub const TRAVEL_RR_PRS: &str = "travel_rr_prs";
}

/// GPS status string reported when the receiver has no fix
pub const GPS_NO_FIX: &str = "NO FIX";

/// GPS sub-record of a telemetry snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub alt: f64,
    #[serde(default)]
    pub sats: u32,
    #[serde(default = "default_gps_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc: Option<String>,
}

fn default_gps_status() -> String {
    "active".to_string()
}

impl GpsFix {
    /// Whether the receiver reported a usable position
    pub fn has_fix(&self) -> bool {
        self.status != GPS_NO_FIX
            && self.lat.is_some_and(|v| v != 0.0)
            && self.lon.is_some_and(|v| v != 0.0)
    }

    /// Canonical form: a "NO FIX" record carries no position and zeroed motion
    pub fn normalize(mut self) -> Self {
        if self.status == GPS_NO_FIX {
            self.lat = None;
            self.lon = None;
            self.speed = 0.0;
            self.alt = 0.0;
            self.sats = 0;
        }
        self
    }
}

/// Message fields that describe a snapshot rather than carry a reading
pub const METADATA_KEYS: [&str; 5] = ["timestamp", "device_id", "deviceId", "device_type", "id"];

/// One complete set of raw readings from the machine.
///
/// Analog channels carry values on the controller's internal scale
/// (roughly 0–28 or 0–105); discrete channels carry 0/1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    #[serde(flatten)]
    pub channels: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsFix>,
}

impl RawSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style channel assignment
    pub fn with(mut self, channel: impl Into<String>, value: f64) -> Self {
        self.channels.insert(channel.into(), value);
        self
    }

    /// Builder-style channel removal
    pub fn without(mut self, channel: &str) -> Self {
        self.channels.remove(channel);
        self
    }

    pub fn set(&mut self, channel: impl Into<String>, value: f64) {
        self.channels.insert(channel.into(), value);
    }

    pub fn get(&self, channel: &str) -> Option<f64> {
        self.channels.get(channel).copied()
    }

    /// Lenient conversion from an arbitrary JSON object.
    ///
    /// Numbers become channels, booleans become 0/1, numeric strings are
    /// parsed, `gps` is read as a [`GpsFix`]. Metadata keys (see
    /// [`METADATA_KEYS`]) and anything non-numeric are ignored. Returns `None`
    /// when the value is not an object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let mut snapshot = Self::new();
        for (key, v) in obj {
            if METADATA_KEYS.contains(&key.as_str()) {
                continue;
            }
            if key == "gps" {
                snapshot.gps = serde_json::from_value::<GpsFix>(v.clone())
                    .ok()
                    .map(GpsFix::normalize);
                continue;
            }
            let reading = match v {
                Value::Number(n) => n.as_f64(),
                Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            if let Some(reading) = reading.filter(|r| r.is_finite()) {
                snapshot.channels.insert(key.clone(), reading);
            }
        }
        Some(snapshot)
    }

    /// Whether the engine may be running.
    ///
    /// Only a snapshot reporting both `cam_sen` and `crank_sen` as 0 counts
    /// as stopped. A missing flag says nothing about the engine.
    pub fn engine_running(&self) -> bool {
        let stopped = |channel: &str| self.get(channel) == Some(0.0);
        !(stopped(channels::CAM_SEN) && stopped(channels::CRANK_SEN))
    }

    /// Plausibility problems with this snapshot (empty when valid)
    pub fn issues(&self) -> Vec<SnapshotIssue> {
        const REQUIRED: [&str; 4] = [
            channels::RAD_WTR_LVL,
            channels::ENG_OIL_LVL,
            channels::FUEL_LVL,
            channels::HYD_OIL_TEMP,
        ];
        const PERCENT: [&str; 2] = [channels::ENG_OIL_LVL, channels::FUEL_LVL];

        let mut issues: Vec<SnapshotIssue> = REQUIRED
            .iter()
            .filter(|c| self.get(c).is_none())
            .map(|c| SnapshotIssue::MissingChannel(c.to_string()))
            .collect();

        for channel in PERCENT {
            if let Some(value) = self.get(channel) {
                if !(0.0..=100.0).contains(&value) {
                    issues.push(SnapshotIssue::OutOfRange {
                        channel: channel.to_string(),
                        value,
                    });
                }
            }
        }
        issues
    }

    pub fn is_valid(&self) -> bool {
        self.issues().is_empty()
    }

    /// Headline readings used by overview displays
    pub fn critical_metrics(&self) -> CriticalMetrics {
        CriticalMetrics {
            engine_oil_level: self.get(channels::ENG_OIL_LVL),
            fuel_level: self.get(channels::FUEL_LVL),
            hydraulic_temperature: self.get(channels::HYD_OIL_TEMP),
            coolant_temperature: self.get(channels::ENG_WTR_TEMP),
            boost_pressure: self.get(channels::BOOST_PRS),
        }
    }

    /// Work-equipment load summary; paired channels report their maximum
    pub fn operational_metrics(&self) -> OperationalMetrics {
        let max_of = |names: &[&str]| {
            names
                .iter()
                .map(|c| self.get(c).unwrap_or(0.0))
                .fold(0.0_f64, f64::max)
        };
        OperationalMetrics {
            arm_pressure: self.get(channels::ARM_DIG_PRS),
            boom_pressure: self.get(channels::BOOM_UP_PRS),
            bucket_pressure: self.get(channels::BUCKET_DIG_PRS),
            swing_pressure: max_of(&[channels::SWING_LEFT_PRS, channels::SWING_RIGHT_PRS]),
            travel_pressure: max_of(&[
                channels::TRAVEL_LF_PRS,
                channels::TRAVEL_RF_PRS,
                channels::TRAVEL_LR_PRS,
                channels::TRAVEL_RR_PRS,
            ]),
        }
    }
}

/// A plausibility problem found by [`RawSnapshot::issues`]
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotIssue {
    MissingChannel(String),
    OutOfRange { channel: String, value: f64 },
}

impl fmt::Display for SnapshotIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotIssue::MissingChannel(c) => write!(f, "missing required channel {}", c),
            SnapshotIssue::OutOfRange { channel, value } => {
                write!(f, "{} out of range: {}", channel, value)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalMetrics {
    pub engine_oil_level: Option<f64>,
    pub fuel_level: Option<f64>,
    pub hydraulic_temperature: Option<f64>,
    pub coolant_temperature: Option<f64>,
    pub boost_pressure: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalMetrics {
    pub arm_pressure: Option<f64>,
    pub boom_pressure: Option<f64>,
    pub bucket_pressure: Option<f64>,
    pub swing_pressure: f64,
    pub travel_pressure: f64,
}

/// Readings converted to engineering units (°C, MPa, kPa, %).
///
/// Always derived from a [`RawSnapshot`], never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalSnapshot {
    #[serde(flatten)]
    pub channels: BTreeMap<String, f64>,
}

impl PhysicalSnapshot {
    pub fn get(&self, channel: &str) -> Option<f64> {
        self.channels.get(channel).copied()
    }

    pub fn insert(&mut self, channel: impl Into<String>, value: f64) {
        self.channels.insert(channel.into(), value);
    }
}
