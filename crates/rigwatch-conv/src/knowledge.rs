//! Knowledge base - the single source of truth for sensor rules
//!
//! Holds one [`SensorRule`] per channel, loaded from a YAML table. The table
//! is read-only once loaded.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use rigwatch_core::{PhysicalSnapshot, RawSnapshot};
use serde::{Deserialize, Serialize};

use crate::error::{ConvError, ConvResult};
use crate::precision::{round_to_precision, DEFAULT_PRECISION};
use crate::rule::{FaultSpec, SensorRule, Slot};

/// Built-in rule table for the PC200 excavator
const BUILTIN_PC200: &str = include_str!("../rules/pc200.yaml");

/// Metadata about a rule table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeMeta {
    /// Machine model the table applies to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// File format for rule tables
#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    meta: Option<KnowledgeMeta>,
    #[serde(default)]
    channels: BTreeMap<String, SensorRule>,
}

/// Validated, read-only table of sensor rules keyed by channel
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    meta: KnowledgeMeta,
    rules: BTreeMap<String, SensorRule>,
    /// Fault code → (channel, slot)
    code_index: HashMap<String, (String, Slot)>,
}

impl KnowledgeBase {
    /// The built-in PC200 table
    pub fn builtin() -> ConvResult<Self> {
        Self::from_yaml(BUILTIN_PC200)
    }

    /// Load rules from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> ConvResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load rules from a YAML string
    pub fn from_yaml(yaml: &str) -> ConvResult<Self> {
        let file: RuleFile = serde_yaml::from_str(yaml)?;
        let rules = file.channels.into_iter().map(|(channel, mut rule)| {
            rule.channel = channel;
            rule
        });
        Self::from_rules(file.meta.unwrap_or_default(), rules)
    }

    /// Build a table from rules, validating each and the table as a whole
    pub fn from_rules(
        meta: KnowledgeMeta,
        rules: impl IntoIterator<Item = SensorRule>,
    ) -> ConvResult<Self> {
        let mut kb = Self {
            meta,
            ..Default::default()
        };

        for rule in rules {
            rule.validate()?;
            for slot in [Slot::Critical, Slot::Low, Slot::Warning] {
                let Some(code) = rule.slot(slot).and_then(|s| s.code.clone()) else {
                    continue;
                };
                if let Some((channel, existing)) = kb.code_index.get(&code) {
                    return Err(ConvError::DuplicateCode {
                        code,
                        first: format!("{}.{}", channel, existing.as_str()),
                        second: format!("{}.{}", rule.channel, slot.as_str()),
                    });
                }
                kb.code_index.insert(code, (rule.channel.clone(), slot));
            }
            if kb.rules.contains_key(&rule.channel) {
                return Err(ConvError::invalid(&rule.channel, "channel defined twice"));
            }
            kb.rules.insert(rule.channel.clone(), rule);
        }

        tracing::debug!(
            rules = kb.rules.len(),
            codes = kb.code_index.len(),
            "Loaded sensor knowledge base"
        );
        Ok(kb)
    }

    pub fn meta(&self) -> &KnowledgeMeta {
        &self.meta
    }

    pub fn get(&self, channel: &str) -> Option<&SensorRule> {
        self.rules.get(channel)
    }

    /// All rules, ordered by channel name
    pub fn rules(&self) -> impl Iterator<Item = &SensorRule> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule and fault definition behind a fault code
    pub fn spec_for(&self, code: &str) -> Option<(&SensorRule, &FaultSpec)> {
        let (channel, slot) = self.code_index.get(code)?;
        let rule = self.rules.get(channel)?;
        Some((rule, rule.slot(*slot)?))
    }

    /// Convert every known channel to physical units.
    ///
    /// Channels without a rule are passed through unchanged.
    pub fn condition(&self, snapshot: &RawSnapshot) -> PhysicalSnapshot {
        let mut physical = PhysicalSnapshot::default();
        for (channel, raw) in &snapshot.channels {
            let value = match self.rules.get(channel) {
                Some(rule) => round_to_precision(
                    rule.physical(snapshot),
                    rule.precision.unwrap_or(DEFAULT_PRECISION),
                ),
                None => *raw,
            };
            physical.insert(channel.clone(), value);
        }
        physical
    }
}
