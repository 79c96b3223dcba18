//! Output structures for one controller step

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::types::{CallState, Decision, Route, SatisfactionScore, Transition};

/// What the controller did with one caller input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutput {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub turn_number: u32,
    /// State after the step
    pub state: CallState,
    /// Edges taken during the step, in order
    pub transitions: Vec<Transition>,
    /// Text to speak; `None` means hang up silently
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<Route>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satisfaction: Option<SatisfactionScore>,
    /// Internal fault that was absorbed (engine error, schema violation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

impl TurnOutput {
    pub fn new(session_id: impl Into<String>, turn_number: u32, state: CallState) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: session_id.into(),
            turn_number,
            state,
            transitions: Vec::new(),
            reply: None,
            decision: None,
            route: None,
            satisfaction: None,
            fault: None,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.state.is_ended()
    }

    /// Did the step pass through `from -> to`?
    pub fn passed(&self, from: CallState, to: CallState) -> bool {
        self.transitions.iter().any(|t| t.from == from && t.to == to)
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let head = format!("[turn {}] state={}", self.turn_number, self.state)
            .color(self.state.color())
            .bold();
        let mut line = head.to_string();
        if let Some(d) = &self.decision {
            line.push_str(&format!(
                " | intent={} urgency={} action={} conf={:.3}",
                d.intent, d.urgency, d.action, d.confidence
            ));
        }
        if let Some(Route::Escalate { reason }) = &self.route {
            line.push_str(&format!(" | {}", reason.message.red()));
        }
        if let Some(reply) = &self.reply {
            line.push_str(&format!("\n  {} {}", "bot:".cyan(), reply));
        }
        line
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        let mut line = format!("turn={} | state={}", self.turn_number, self.state);
        if let Some(d) = &self.decision {
            line.push_str(&format!(
                " | intent={} | urgency={} | action={} | confidence={:.3}",
                d.intent, d.urgency, d.action, d.confidence
            ));
        }
        if let Some(route) = &self.route {
            line.push_str(&format!(" | route={}", route.reason_code().code()));
        }
        line
    }
}
