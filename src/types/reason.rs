//! Reason codes for routing outcomes

use serde::{Deserialize, Serialize};

/// Reason codes for every routing outcome of the override layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // R1xx: Escalation
    // =========================================================================
    /// Base policy asked for escalation with enough confidence
    R101_POLICY_REQUESTED,
    /// Urgency classified as high
    R102_HIGH_URGENCY,
    /// NEGATIVE/ANGRY emotion above threshold
    R103_EMOTIONAL_DISTRESS,
    /// Intent is on the human-only list
    R104_INTENT_REQUIRES_AGENT,
    /// Utterance contains a sensitive keyword
    R105_SENSITIVE_KEYWORD,

    // =========================================================================
    // R2xx: Re-prompt
    // =========================================================================
    /// Transcript looks like ASR garbage, ask the caller to repeat
    R201_UNRECOGNIZED_INPUT,

    // =========================================================================
    // R3xx: Automated handling
    // =========================================================================
    /// No override fired, answer automatically
    R301_AUTOMATED,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::R101_POLICY_REQUESTED => "R101_POLICY_REQUESTED",
            Self::R102_HIGH_URGENCY => "R102_HIGH_URGENCY",
            Self::R103_EMOTIONAL_DISTRESS => "R103_EMOTIONAL_DISTRESS",
            Self::R104_INTENT_REQUIRES_AGENT => "R104_INTENT_REQUIRES_AGENT",
            Self::R105_SENSITIVE_KEYWORD => "R105_SENSITIVE_KEYWORD",
            Self::R201_UNRECOGNIZED_INPUT => "R201_UNRECOGNIZED_INPUT",
            Self::R301_AUTOMATED => "R301_AUTOMATED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::R101_POLICY_REQUESTED => "policy-requested escalation",
            Self::R102_HIGH_URGENCY => "high urgency",
            Self::R103_EMOTIONAL_DISTRESS => "emotional distress",
            Self::R104_INTENT_REQUIRES_AGENT => "intent requires human agent",
            Self::R105_SENSITIVE_KEYWORD => "sensitive keyword",
            Self::R201_UNRECOGNIZED_INPUT => "unrecognized input, ask to repeat",
            Self::R301_AUTOMATED => "automated response",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
