//! Diagnostic rule evaluation
//!
//! Turns one raw snapshot into a [`Diagnosis`]: the faults it exhibits and
//! the advisory predictions it warrants. Evaluation is pure. It reads the
//! rule table and the snapshot and nothing else.

use std::sync::Arc;

use rigwatch_conv::{KnowledgeBase, Slot};
use rigwatch_core::{Diagnosis, FaultEvent, RawSnapshot};

/// Evaluates snapshots against a rule table
#[derive(Debug, Clone)]
pub struct Evaluator {
    kb: Arc<KnowledgeBase>,
}

impl Evaluator {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self { kb }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// Evaluate a snapshot.
    ///
    /// A stopped engine yields an empty diagnosis. Otherwise rules are
    /// checked in channel order, so identical snapshots always produce
    /// identical output. Digital rules whose input is missing are skipped.
    pub fn evaluate(&self, snapshot: &RawSnapshot) -> Diagnosis {
        let mut diagnosis = Diagnosis::default();
        if !snapshot.engine_running() {
            return diagnosis;
        }

        for rule in self.kb.rules() {
            let Some(value) = rule.reading(snapshot) else {
                continue;
            };
            for slot in rule.breaches(value) {
                let Some(spec) = rule.slot(slot) else {
                    continue;
                };
                let code = match &spec.code {
                    Some(code) if slot != Slot::Warning && !rule.advisory => code,
                    _ => {
                        diagnosis.predictions.push(spec.message.clone());
                        continue;
                    }
                };
                diagnosis.errors.push(FaultEvent {
                    code: code.clone(),
                    message: spec.message.clone(),
                    sensor_channel: rule.channel.clone(),
                    value,
                    severity: spec.severity,
                });
            }
        }

        if !diagnosis.errors.is_empty() {
            tracing::debug!(codes = ?diagnosis.codes(), "Snapshot breaches rules");
        }
        diagnosis
    }
}
