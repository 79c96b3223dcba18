//! Outbound records for the logging and handoff-ticketing collaborators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{CallStatus, Decision, HandoffTicket, Intent, Observation, Route, SatisfactionScore};

/// One closed turn: caller text, bot reply and the decision behind it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub interaction_id: String,
    pub turn_number: u32,
    pub observation: Observation,
    pub decision: Decision,
    pub route: Route,
    pub bot_reply: String,
    pub at: DateTime<Utc>,
}

/// End-of-call summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSummary {
    pub status: CallStatus,
    pub satisfaction: Option<SatisfactionScore>,
    pub turns: u32,
    pub final_intent: Option<Intent>,
    pub ended_at: DateTime<Utc>,
}

/// Persists interactions. Every method is called from blocking context.
pub trait InteractionLog: Send + Sync {
    /// Returns the opaque interaction id for a new call
    fn open_interaction(&self, session_id: &str) -> Result<String>;

    fn log_turn(&self, record: &TurnRecord) -> Result<()>;

    fn finalize(&self, interaction_id: &str, summary: &CallSummary) -> Result<()>;
}

/// Receives handoff tickets; ownership of the ticket passes to the desk
pub trait HandoffDesk: Send + Sync {
    /// Returns the ticket id
    fn open_ticket(&self, interaction_id: Option<&str>, ticket: HandoffTicket) -> Result<String>;
}
