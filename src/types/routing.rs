//! Routing outcome produced by the escalation override layer

use serde::{Deserialize, Serialize};

use crate::types::{Decision, ReasonCode};

/// Why a call was escalated. The message is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationReason {
    pub code: ReasonCode,
    pub message: String,
}

impl EscalationReason {
    pub fn new(code: ReasonCode) -> Self {
        Self {
            code,
            message: code.description().to_string(),
        }
    }

    pub fn sensitive_keyword(keyword: &str) -> Self {
        Self {
            code: ReasonCode::R105_SENSITIVE_KEYWORD,
            message: format!("sensitive keyword: {keyword}"),
        }
    }
}

impl std::fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Three-way outcome of a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Route {
    /// Automated answer (action = rag_query)
    Respond,
    /// Human handoff (action = escalate)
    Escalate { reason: EscalationReason },
    /// Re-prompt without a ticket and without counting the text as content
    Repeat,
}

impl Route {
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            Route::Respond => ReasonCode::R301_AUTOMATED,
            Route::Escalate { reason } => reason.code,
            Route::Repeat => ReasonCode::R201_UNRECOGNIZED_INPUT,
        }
    }

    pub fn is_escalation(&self) -> bool {
        matches!(self, Route::Escalate { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Respond => "respond",
            Route::Escalate { .. } => "escalate",
            Route::Repeat => "repeat",
        }
    }
}

/// Decision after overrides, with its route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedDecision {
    pub decision: Decision,
    pub route: Route,
}

impl RoutedDecision {
    pub fn safe_default() -> Self {
        Self {
            decision: Decision::safe_default(),
            route: Route::Respond,
        }
    }

    /// Escalation reason, if any
    pub fn reason(&self) -> Option<&EscalationReason> {
        match &self.route {
            Route::Escalate { reason } => Some(reason),
            _ => None,
        }
    }
}
