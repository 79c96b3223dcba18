//! Action policy: ordered decision table, first matching rule wins
//!
//! 1. urgency high                          → escalate
//! 2. complaint with confidence < 0.30      → escalate
//! 3. unknown with confidence < 0.25        → escalate
//! 4. intent on the automated allow-list    → rag_query
//! 5. confidence < 0.20                     → escalate
//! 6. otherwise                             → rag_query
//!
//! Rule 4 sits before rule 5: well-known intents are never escalated for low
//! confidence alone.

use serde::Serialize;

use crate::config::PolicyTuning;
use crate::types::{Action, Intent, Urgency};

/// Which rule produced the base action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyRule {
    HighUrgency,
    LowConfidenceComplaint,
    LowConfidenceUnknown,
    AutomatedIntent,
    LowConfidence,
    Default,
}

#[derive(Debug, Clone, Default)]
pub struct ActionPolicy {
    tuning: PolicyTuning,
}

impl ActionPolicy {
    pub fn new(tuning: PolicyTuning) -> Self {
        Self { tuning }
    }

    pub fn decide(&self, urgency: Urgency, intent: Intent, confidence: f64) -> (Action, PolicyRule) {
        let t = &self.tuning;
        if urgency == Urgency::High {
            (Action::Escalate, PolicyRule::HighUrgency)
        } else if intent == Intent::Complaint && confidence < t.complaint_escalate_below {
            (Action::Escalate, PolicyRule::LowConfidenceComplaint)
        } else if intent == Intent::Unknown && confidence < t.unknown_escalate_below {
            (Action::Escalate, PolicyRule::LowConfidenceUnknown)
        } else if t.automated_intents.contains(&intent) {
            (Action::RagQuery, PolicyRule::AutomatedIntent)
        } else if confidence < t.low_confidence_escalate_below {
            (Action::Escalate, PolicyRule::LowConfidence)
        } else {
            (Action::RagQuery, PolicyRule::Default)
        }
    }
}
