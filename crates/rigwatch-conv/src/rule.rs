//! Sensor rule structures
//!
//! A [`SensorRule`] is the complete diagnostic definition for one channel:
//! how to convert it, which thresholds apply, and which fault each threshold
//! crossing raises.

use rigwatch_core::{FaultSeverity, RawSnapshot};
use serde::{Deserialize, Serialize};

use crate::conditioner::Conversion;
use crate::error::{ConvError, ConvResult};

/// Comparison family of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    /// Faults at or above `critical`; optionally at or below `low_error`
    Upper,
    /// Faults below `critical`
    Lower,
    /// Faults outside `normal`
    Range,
    /// Raw discrete input: faults below `low_error` or at/above `critical`
    Digital,
}

/// What a rule slot raises when its threshold is crossed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultSpec {
    /// Fault code; required unless the rule is advisory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(default)]
    pub severity: FaultSeverity,
}

/// Fault slots of a rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleFaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<FaultSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<FaultSpec>,
    /// Always advisory: produces a prediction, never a fault
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<FaultSpec>,
}

/// Which slot of a rule a reading crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Critical,
    Low,
    Warning,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Critical => "critical",
            Slot::Low => "low",
            Slot::Warning => "warning",
        }
    }
}

/// Complete diagnostic definition for a single channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRule {
    /// Channel name (set from the table key)
    #[serde(skip)]
    pub channel: String,

    /// Human-readable display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Unit string (e.g., "°C", "MPa", "kPa")
    pub unit: String,

    pub conversion: Conversion,

    #[serde(rename = "type")]
    pub rule_type: RuleType,

    /// Normal operating band `[min, max]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<[f64; 2]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_error: Option<f64>,

    /// Skip the rule when the channel reads exactly 0 (no signal)
    #[serde(default)]
    pub require_signal: bool,

    /// Emit predictions instead of faults
    #[serde(default)]
    pub advisory: bool,

    /// Decimal places for conditioned output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,

    #[serde(default)]
    pub faults: RuleFaults,
}

impl SensorRule {
    /// Physical value of this rule's channel in a snapshot
    pub fn physical(&self, snapshot: &RawSnapshot) -> f64 {
        self.conversion.apply(snapshot.get(&self.channel))
    }

    /// Value the rule's thresholds are compared against.
    ///
    /// Digital rules compare the raw input and have nothing to check when
    /// the input is missing. Analog rules use the conditioned value, where
    /// a missing reading is 0.
    pub fn reading(&self, snapshot: &RawSnapshot) -> Option<f64> {
        match self.rule_type {
            RuleType::Digital => snapshot.get(&self.channel).filter(|v| v.is_finite()),
            _ => Some(self.physical(snapshot)),
        }
    }

    pub fn slot(&self, slot: Slot) -> Option<&FaultSpec> {
        match slot {
            Slot::Critical => self.faults.critical.as_ref(),
            Slot::Low => self.faults.low.as_ref(),
            Slot::Warning => self.faults.warning.as_ref(),
        }
    }

    /// Slots crossed by a physical value, critical before low.
    ///
    /// Upper rules can report both a critical and a low crossing for one
    /// reading when the thresholds overlap; they are independent checks.
    pub fn breaches(&self, value: f64) -> Vec<Slot> {
        let mut crossed = Vec::new();
        if self.require_signal && value == 0.0 {
            return crossed;
        }

        match self.rule_type {
            RuleType::Upper => {
                if self.critical.is_some_and(|c| value >= c) {
                    crossed.push(Slot::Critical);
                } else if self.warning.is_some_and(|w| value >= w) {
                    crossed.push(Slot::Warning);
                }
                if self.low_error.is_some_and(|l| value <= l) {
                    crossed.push(Slot::Low);
                }
            }
            RuleType::Lower => {
                if self.critical.is_some_and(|c| value < c) {
                    crossed.push(Slot::Critical);
                } else if self.warning.is_some_and(|w| value < w) {
                    crossed.push(Slot::Warning);
                }
            }
            RuleType::Range => {
                if let Some([min, max]) = self.normal {
                    if value < min || value > max {
                        crossed.push(Slot::Critical);
                    }
                }
            }
            RuleType::Digital => {
                if self.critical.is_some_and(|c| value >= c) {
                    crossed.push(Slot::Critical);
                }
                if self.low_error.is_some_and(|l| value < l) {
                    crossed.push(Slot::Low);
                }
            }
        }
        crossed
    }

    /// Check that the rule is self-consistent
    pub fn validate(&self) -> ConvResult<()> {
        let fail = |reason: &str| Err(ConvError::invalid(&self.channel, reason));

        match self.rule_type {
            RuleType::Upper | RuleType::Digital => {
                if self.critical.is_none() && self.low_error.is_none() {
                    return fail("needs a critical or low_error threshold");
                }
            }
            RuleType::Lower => {
                if self.critical.is_none() {
                    return fail("lower rule needs a critical threshold");
                }
            }
            RuleType::Range => match self.normal {
                None => return fail("range rule needs a normal band"),
                Some([min, max]) if min > max => {
                    return fail("normal band min is greater than max")
                }
                Some(_) => {}
            },
        }

        if self.rule_type == RuleType::Digital && !self.conversion.is_direct() {
            return fail("digital rule must use direct conversion");
        }

        let needs_critical = self.critical.is_some() || self.rule_type == RuleType::Range;
        if needs_critical && self.faults.critical.is_none() {
            return fail("critical threshold has no fault to raise");
        }
        if self.low_error.is_some() && self.faults.low.is_none() {
            return fail("low_error threshold has no fault to raise");
        }
        if self.warning.is_some()
            && matches!(self.rule_type, RuleType::Upper | RuleType::Lower)
            && self.faults.warning.is_none()
        {
            return fail("warning threshold has no message");
        }

        if !self.advisory {
            for slot in [Slot::Critical, Slot::Low] {
                if let Some(spec) = self.slot(slot) {
                    if spec.code.is_none() {
                        return Err(ConvError::invalid(
                            &self.channel,
                            format!("{} fault needs a code", slot.as_str()),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper() -> SensorRule {
        SensorRule {
            channel: "eng_wtr_temp".into(),
            name: None,
            unit: "°C".into(),
            conversion: Conversion::Temperature { manual_max: 120.0 },
            rule_type: RuleType::Upper,
            normal: Some([80.0, 110.0]),
            warning: Some(102.0),
            critical: Some(105.0),
            low_error: Some(30.0),
            require_signal: false,
            advisory: false,
            precision: None,
            faults: RuleFaults {
                critical: Some(FaultSpec {
                    code: Some("E03".into()),
                    message: "overheat".into(),
                    severity: FaultSeverity::Critical,
                }),
                low: Some(FaultSpec {
                    code: Some("E02".into()),
                    message: "cold".into(),
                    severity: FaultSeverity::Warning,
                }),
                warning: Some(FaultSpec {
                    code: None,
                    message: "approaching overheat".into(),
                    severity: FaultSeverity::Warning,
                }),
            },
        }
    }

    #[test]
    fn test_upper_breaches() {
        let rule = upper();
        assert_eq!(rule.breaches(120.0), vec![Slot::Critical]);
        assert_eq!(rule.breaches(105.0), vec![Slot::Critical]);
        assert_eq!(rule.breaches(103.0), vec![Slot::Warning]);
        assert_eq!(rule.breaches(90.0), vec![]);
        assert_eq!(rule.breaches(30.0), vec![Slot::Low]);
        assert_eq!(rule.breaches(0.0), vec![Slot::Low]);
    }

    #[test]
    fn test_upper_overlapping_thresholds_fire_independently() {
        let mut rule = upper();
        rule.low_error = Some(110.0);
        assert_eq!(rule.breaches(107.0), vec![Slot::Critical, Slot::Low]);
    }

    #[test]
    fn test_lower_and_require_signal() {
        let mut rule = upper();
        rule.rule_type = RuleType::Lower;
        rule.critical = Some(25.0);
        rule.warning = Some(40.0);
        rule.low_error = None;
        rule.require_signal = true;

        assert_eq!(rule.breaches(0.0), vec![]);
        assert_eq!(rule.breaches(10.0), vec![Slot::Critical]);
        assert_eq!(rule.breaches(30.0), vec![Slot::Warning]);
        assert_eq!(rule.breaches(40.0), vec![]);
    }

    #[test]
    fn test_range_and_digital() {
        let mut rule = upper();
        rule.rule_type = RuleType::Range;
        rule.normal = Some([33.0, 39.7]);
        assert_eq!(rule.breaches(32.9), vec![Slot::Critical]);
        assert_eq!(rule.breaches(39.8), vec![Slot::Critical]);
        assert_eq!(rule.breaches(35.0), vec![]);

        rule.rule_type = RuleType::Digital;
        rule.conversion = Conversion::Direct;
        rule.low_error = Some(45.0);
        rule.critical = Some(65.0);
        assert_eq!(rule.breaches(44.0), vec![Slot::Low]);
        assert_eq!(rule.breaches(45.0), vec![]);
        assert_eq!(rule.breaches(65.0), vec![Slot::Critical]);
    }

    #[test]
    fn test_digital_reading_absent_when_input_missing() {
        let mut rule = upper();
        rule.channel = "eng_oil_lvl".into();
        rule.rule_type = RuleType::Digital;
        rule.conversion = Conversion::Direct;

        assert_eq!(rule.reading(&RawSnapshot::new()), None);
        assert_eq!(
            rule.reading(&RawSnapshot::new().with("eng_oil_lvl", f64::NAN)),
            None
        );
        assert_eq!(
            rule.reading(&RawSnapshot::new().with("eng_oil_lvl", 40.0)),
            Some(40.0)
        );

        // analog rules still read a missing channel as 0
        assert_eq!(upper().reading(&RawSnapshot::new()), Some(0.0));
    }

    #[test]
    fn test_validate() {
        assert!(upper().validate().is_ok());

        let mut rule = upper();
        rule.faults.low = None;
        assert!(rule.validate().is_err());

        let mut rule = upper();
        rule.rule_type = RuleType::Digital;
        assert!(matches!(
            rule.validate(),
            Err(ConvError::InvalidRule { .. })
        ));

        let mut rule = upper();
        rule.rule_type = RuleType::Range;
        rule.normal = Some([10.0, 5.0]);
        assert!(rule.validate().is_err());

        let mut rule = upper();
        rule.faults.critical.as_mut().unwrap().code = None;
        assert!(rule.validate().is_err());
        rule.advisory = true;
        assert!(rule.validate().is_ok());
    }
}
