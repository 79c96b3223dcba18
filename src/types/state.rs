//! Call state definitions

use colored::Color;
use serde::{Deserialize, Serialize};

/// The five states of a call handled by the turn controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallState {
    /// Waiting for the next caller transcript
    AwaitingInput,
    /// Running the decision engine on a transcript
    Processing,
    /// Caller said goodbye, closing reply not yet sent
    GoodbyePending,
    /// Satisfaction question asked, waiting for the answer
    FeedbackPending,
    /// Call is over (goodbye, handoff, max turns or hang-up)
    Ended,
}

impl CallState {
    pub fn is_ended(&self) -> bool {
        *self == CallState::Ended
    }

    /// Terminal color for console display
    pub fn color(&self) -> Color {
        match self {
            CallState::AwaitingInput => Color::BrightBlack,
            CallState::Processing => Color::Cyan,
            CallState::GoodbyePending => Color::Yellow,
            CallState::FeedbackPending => Color::Magenta,
            CallState::Ended => Color::Green,
        }
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CallState::AwaitingInput => "AWAITING_INPUT",
            CallState::Processing => "PROCESSING",
            CallState::GoodbyePending => "GOODBYE_PENDING",
            CallState::FeedbackPending => "FEEDBACK_PENDING",
            CallState::Ended => "ENDED",
        };
        write!(f, "{}", name)
    }
}

/// One edge taken by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: CallState,
    pub to: CallState,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
