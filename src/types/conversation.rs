//! Per-call conversation record owned by the turn controller

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "user")]
    Caller,
    #[serde(alias = "assistant")]
    Bot,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Caller => "caller",
            Role::Bot => "bot",
        }
    }
}

/// One utterance in the call history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// State of one call. Lives as long as the call; handed to the
/// interaction log at finalization but never owned by it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    turn_number: u32,
    pub has_said_goodbye: bool,
    pub goodbye_count: u32,
    pub conversation_history: Vec<HistoryEntry>,
    pub session_id: String,
    /// Assigned by the interaction log
    pub interaction_id: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            turn_number: 0,
            has_said_goodbye: false,
            goodbye_count: 0,
            conversation_history: Vec::new(),
            session_id: session_id.into(),
            interaction_id: None,
            started_at: Utc::now(),
        }
    }

    /// Monotonic; only ever reset by creating a new state
    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    /// Enter a new turn, returning its number (1-based)
    pub fn begin_turn(&mut self) -> u32 {
        self.turn_number += 1;
        self.turn_number
    }

    pub fn record(&mut self, role: Role, text: impl Into<String>) {
        self.conversation_history.push(HistoryEntry {
            role,
            text: text.into(),
            at: Utc::now(),
        });
    }

    pub fn mark_goodbye(&mut self) {
        self.has_said_goodbye = true;
        self.goodbye_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turns_are_monotonic() {
        let mut state = ConversationState::new("s1");
        assert_eq!(state.turn_number(), 0);
        assert_eq!(state.begin_turn(), 1);
        assert_eq!(state.begin_turn(), 2);
        assert_eq!(state.turn_number(), 2);
    }

    #[test]
    fn test_goodbye_counting() {
        let mut state = ConversationState::new("s1");
        state.mark_goodbye();
        state.mark_goodbye();
        assert!(state.has_said_goodbye);
        assert_eq!(state.goodbye_count, 2);
    }
}
