//! rigwatch-conv - Signal conditioning and sensor rule tables
//!
//! Converts raw telemetry readings to engineering units and holds the
//! declarative rule table that the diagnostic evaluator interprets.
//!
//! # Quick Start
//!
//! ```rust
//! use rigwatch_conv::{physical_value, ChannelKind, KnowledgeBase};
//! use rigwatch_core::RawSnapshot;
//!
//! // Coolant: raw 105 → 4.5 V → 120 °C on a 120 °C full-scale transducer
//! let coolant = physical_value(Some(105.0), ChannelKind::Temperature, 120.0);
//! assert!((coolant - 120.0).abs() < 1e-9);
//!
//! let kb = KnowledgeBase::builtin().unwrap();
//! let physical = kb.condition(&RawSnapshot::new().with("eng_wtr_temp", 105.0));
//! assert_eq!(physical.get("eng_wtr_temp"), Some(120.0));
//! ```
//!
//! # Rule Files
//!
//! ```yaml
//! meta:
//!   name: PC200 hydraulic excavator
//!   version: "1.0"
//!
//! channels:
//!   eng_wtr_temp:
//!     unit: "°C"
//!     conversion: { type: temperature, manual_max: 120 }
//!     type: upper
//!     critical: 105
//!     low_error: 30
//!     faults:
//!       critical: { code: E03, message: Engine coolant overheating, severity: critical }
//!       low: { code: E02, message: Engine coolant too cold, severity: warning }
//! ```
//!
//! | Type | Fires when |
//! |------|------------|
//! | upper | value ≥ critical (critical slot), value ≤ low_error (low slot) |
//! | lower | value < critical |
//! | range | value outside `normal` |
//! | digital | raw < low_error (low slot), raw ≥ critical (critical slot) |

pub mod conditioner;
pub mod error;
pub mod knowledge;
pub mod precision;
pub mod rule;

pub use conditioner::{physical_value, ChannelKind, Conversion};
pub use error::{ConvError, ConvResult};
pub use knowledge::{KnowledgeBase, KnowledgeMeta};
pub use precision::round_to_precision;
pub use rule::{FaultSpec, RuleFaults, RuleType, SensorRule, Slot};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::conditioner::{physical_value, ChannelKind, Conversion};
    pub use crate::error::{ConvError, ConvResult};
    pub use crate::knowledge::KnowledgeBase;
    pub use crate::rule::{RuleType, SensorRule};
}
