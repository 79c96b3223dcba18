//! Core types for the callbot

mod conversation;
mod decision;
mod feedback;
mod observation;
mod output;
mod reason;
mod routing;
mod state;
mod ticket;

pub use conversation::{ConversationState, HistoryEntry, Role};
pub use decision::{Action, Decision, Intent, Urgency};
pub use feedback::{CallStatus, SatisfactionScore};
pub use observation::{AudioSummary, EmotionLabel, Observation, RawAudio, RawEmotion};
pub use output::TurnOutput;
pub use reason::ReasonCode;
pub use routing::{EscalationReason, RoutedDecision, Route};
pub use state::{CallState, Transition};
pub use ticket::{HandoffTicket, QueueType};
