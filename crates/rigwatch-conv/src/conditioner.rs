//! Signal conditioning: raw controller scale back to engineering units
//!
//! The machine's controller encodes each analog channel as
//! `(voltage - 0.5) * multiplier`, where the multiplier depends on the
//! transducer type. Conditioning inverts that to recover the sensor voltage,
//! drops anything under the noise floor, and maps the 0.5–4.5 V span onto
//! the channel's full-scale value from the equipment manual.

use serde::{Deserialize, Serialize};

/// Voltage the transducers output at zero reading
pub const ZERO_VOLTAGE: f64 = 0.5;

/// Reconstructed voltages below this are treated as "no signal"
pub const NOISE_FLOOR_VOLTAGE: f64 = 0.55;

/// Voltage span between zero and full scale (0.5 V to 4.5 V)
pub const REFERENCE_SPAN: f64 = 4.0;

/// Controller multiplier for temperature transducers
pub const TEMPERATURE_MULTIPLIER: f64 = 26.25;

/// Controller multiplier for pressure and other transducers
pub const PRESSURE_MULTIPLIER: f64 = 7.0;

/// Transducer family of an analog channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Temperature,
    Pressure,
}

impl ChannelKind {
    pub fn multiplier(&self) -> f64 {
        match self {
            ChannelKind::Temperature => TEMPERATURE_MULTIPLIER,
            ChannelKind::Pressure => PRESSURE_MULTIPLIER,
        }
    }
}

/// Convert a raw reading to its physical value.
///
/// Absent, non-finite and below-floor readings yield exactly `0.0`.
pub fn physical_value(raw: Option<f64>, kind: ChannelKind, manual_max: f64) -> f64 {
    let Some(raw) = raw.filter(|r| r.is_finite()) else {
        return 0.0;
    };
    let voltage = raw / kind.multiplier() + ZERO_VOLTAGE;
    if voltage < NOISE_FLOOR_VOLTAGE {
        return 0.0;
    }
    (voltage - ZERO_VOLTAGE) * (manual_max / REFERENCE_SPAN)
}

/// How a channel's raw value becomes a physical value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Conversion {
    /// Temperature transducer, full scale `manual_max`
    Temperature { manual_max: f64 },
    /// Pressure (or other) transducer, full scale `manual_max`
    Pressure { manual_max: f64 },
    /// Ratio of the raw full scale mapped onto a voltage
    Voltage { full_scale: f64, volts: f64 },
    /// Raw value used as-is (discrete inputs, percentage levels)
    Direct,
}

impl Conversion {
    pub fn apply(&self, raw: Option<f64>) -> f64 {
        match *self {
            Conversion::Temperature { manual_max } => {
                physical_value(raw, ChannelKind::Temperature, manual_max)
            }
            Conversion::Pressure { manual_max } => {
                physical_value(raw, ChannelKind::Pressure, manual_max)
            }
            Conversion::Voltage { full_scale, volts } => match raw.filter(|r| r.is_finite()) {
                Some(raw) if full_scale > 0.0 => raw / full_scale * volts,
                _ => 0.0,
            },
            Conversion::Direct => raw.filter(|r| r.is_finite()).unwrap_or(0.0),
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, Conversion::Direct)
    }
}
