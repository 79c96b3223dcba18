//! Callbot: routing core for a voice insurance-support line
//!
//! transcript + emotion + audio metrics → Observation → classifier →
//! confidence → action policy → escalation overrides → turn controller

pub mod config;
pub mod core;
pub mod error;
pub mod types;

pub use error::{CallbotError, Result};

// =============================================================================
// CONFIDENCE [C] - tuned, not physical; overridable through `[confidence]`
// =============================================================================

/// Starting confidence before any keyword evidence
pub const CONFIDENCE_BASE: f64 = 0.60;

/// Weight applied to intent match strength
pub const CONFIDENCE_STRENGTH_WEIGHT: f64 = 0.35;

/// Hit count at which match strength saturates at 1.0
pub const STRENGTH_SATURATION_HITS: f64 = 3.0;

/// Greetings come from short keyword lists and are reliably detected
pub const GREETING_CONFIDENCE_FLOOR: f64 = 0.85;

/// Penalty when no intent matched at all
pub const UNKNOWN_INTENT_PENALTY: f64 = 0.25;

/// Mostly-silent recordings give unreliable transcriptions
pub const SILENCE_RATIO_THRESHOLD: f64 = 0.60;
pub const SILENCE_PENALTY: f64 = 0.15;

/// Clipped audio degrades transcription fidelity
pub const CLIPPING_RATIO_THRESHOLD: f64 = 0.05;
pub const CLIPPING_PENALTY: f64 = 0.10;

// =============================================================================
// ACTION POLICY [C]
// =============================================================================

pub const COMPLAINT_ESCALATE_BELOW: f64 = 0.30;
pub const UNKNOWN_ESCALATE_BELOW: f64 = 0.25;
pub const LOW_CONFIDENCE_ESCALATE_BELOW: f64 = 0.20;

// =============================================================================
// ESCALATION OVERRIDES [C]
// =============================================================================

/// Base-policy escalations above this confidence are honoured
pub const POLICY_ESCALATE_ABOVE: f64 = 0.50;

/// NEGATIVE/ANGRY emotion score above which the caller is in distress
pub const EMOTION_DISTRESS_ABOVE: f64 = 0.80;

/// Single words shorter than this (in chars) may be ASR garbage
pub const GARBAGE_WORD_MAX_LEN: usize = 4;
pub const GARBAGE_SINGLE_WORD_CONF_BELOW: f64 = 0.20;
pub const GARBAGE_UNKNOWN_CONF_BELOW: f64 = 0.15;

// =============================================================================
// CONVERSATION [C]
// =============================================================================

/// Hard cutoff on caller turns per call
pub const MAX_CONVERSATION_TURNS: u32 = 10;

/// How long to wait for the satisfaction answer (milliseconds)
pub const FEEDBACK_TIMEOUT_MS: u64 = 10_000;

/// Longest spoken answer before truncation (characters)
pub const MAX_VOICE_LENGTH: usize = 180;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
