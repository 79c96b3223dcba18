//! Runtime configuration
//!
//! Every threshold used by the decision core is tunable here. Loaded from a
//! TOML file; every section and field has a default so an empty file is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CallbotError, Result};
use crate::types::Intent;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbotConfig {
    pub confidence: ConfidenceTuning,
    pub policy: PolicyTuning,
    pub overrides: OverrideTuning,
    pub conversation: ConversationConfig,
    pub decider: DeciderConfig,
    pub catalog: CatalogConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

impl CallbotConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: CallbotConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CallbotError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Reject settings that would make the controller or estimator misbehave
    pub fn validate(&self) -> Result<()> {
        if self.conversation.max_turns == 0 {
            return Err(CallbotError::Config("conversation.max_turns must be at least 1".into()));
        }
        if self.conversation.feedback_timeout_ms == 0 {
            return Err(CallbotError::Config(
                "conversation.feedback_timeout_ms must be positive".into(),
            ));
        }
        if self.confidence.saturation_hits <= 0.0 {
            return Err(CallbotError::Config("confidence.saturation_hits must be positive".into()));
        }
        if self.decider.mode == DeciderMode::Model && self.decider.model_endpoint.trim().is_empty() {
            return Err(CallbotError::Config("decider.model_endpoint is required in model mode".into()));
        }
        Ok(())
    }
}

/// Additive confidence heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceTuning {
    pub base: f64,
    pub strength_weight: f64,
    pub saturation_hits: f64,
    pub greeting_floor: f64,
    pub unknown_penalty: f64,
    pub silence_threshold: f64,
    pub silence_penalty: f64,
    pub clipping_threshold: f64,
    pub clipping_penalty: f64,
}

impl Default for ConfidenceTuning {
    fn default() -> Self {
        Self {
            base: crate::CONFIDENCE_BASE,
            strength_weight: crate::CONFIDENCE_STRENGTH_WEIGHT,
            saturation_hits: crate::STRENGTH_SATURATION_HITS,
            greeting_floor: crate::GREETING_CONFIDENCE_FLOOR,
            unknown_penalty: crate::UNKNOWN_INTENT_PENALTY,
            silence_threshold: crate::SILENCE_RATIO_THRESHOLD,
            silence_penalty: crate::SILENCE_PENALTY,
            clipping_threshold: crate::CLIPPING_RATIO_THRESHOLD,
            clipping_penalty: crate::CLIPPING_PENALTY,
        }
    }
}

/// Ordered base action rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyTuning {
    pub complaint_escalate_below: f64,
    pub unknown_escalate_below: f64,
    pub low_confidence_escalate_below: f64,
    /// Intents that are always answered automatically (rule 4)
    pub automated_intents: Vec<Intent>,
}

impl Default for PolicyTuning {
    fn default() -> Self {
        Self {
            complaint_escalate_below: crate::COMPLAINT_ESCALATE_BELOW,
            unknown_escalate_below: crate::UNKNOWN_ESCALATE_BELOW,
            low_confidence_escalate_below: crate::LOW_CONFIDENCE_ESCALATE_BELOW,
            automated_intents: vec![
                Intent::Greeting,
                Intent::GeneralInfo,
                Intent::DeclareClaim,
                Intent::CheckStatus,
                Intent::UpdateInfo,
                Intent::PaymentInfo,
            ],
        }
    }
}

/// Hard overrides applied after the base policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideTuning {
    pub policy_escalate_above: f64,
    pub emotion_score_above: f64,
    pub garbage_word_max_len: usize,
    pub garbage_single_word_conf_below: f64,
    pub garbage_unknown_conf_below: f64,
    /// Intents that always go to a human
    pub agent_intents: Vec<Intent>,
}

impl Default for OverrideTuning {
    fn default() -> Self {
        Self {
            policy_escalate_above: crate::POLICY_ESCALATE_ABOVE,
            emotion_score_above: crate::EMOTION_DISTRESS_ABOVE,
            garbage_word_max_len: crate::GARBAGE_WORD_MAX_LEN,
            garbage_single_word_conf_below: crate::GARBAGE_SINGLE_WORD_CONF_BELOW,
            garbage_unknown_conf_below: crate::GARBAGE_UNKNOWN_CONF_BELOW,
            agent_intents: vec![
                Intent::ClaimDispute,
                Intent::LegalIssue,
                Intent::Complaint,
                Intent::ContractCancellation,
                Intent::FraudReport,
                Intent::DeathClaim,
                Intent::HumanTransfer,
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub max_turns: u32,
    pub feedback_timeout_ms: u64,
    /// Ask the satisfaction question after goodbye
    pub collect_feedback: bool,
    pub end_keywords: Vec<String>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_turns: crate::MAX_CONVERSATION_TURNS,
            feedback_timeout_ms: crate::FEEDBACK_TIMEOUT_MS,
            collect_feedback: true,
            end_keywords: [
                "au revoir",
                "aurevoir",
                "bonne journée",
                "bonne journee",
                "bonne soirée",
                "bonne soiree",
                "à bientôt",
                "a bientot",
                "bye",
                "adieu",
                "ciao",
                "c'est tout",
                "ce sera tout",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ConversationConfig {
    pub fn feedback_timeout(&self) -> Duration {
        Duration::from_millis(self.feedback_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeciderMode {
    #[default]
    Rules,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeciderConfig {
    pub mode: DeciderMode,
    pub model_endpoint: String,
    pub model_name: String,
    pub request_timeout_ms: u64,
}

impl Default for DeciderConfig {
    fn default() -> Self {
        Self {
            mode: DeciderMode::Rules,
            model_endpoint: "http://localhost:11434".to_string(),
            model_name: "llama3.2:1b-instruct".to_string(),
            request_timeout_ms: 8_000,
        }
    }
}

/// Optional keyword catalog replacing the built-in French one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file, or ":memory:"
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "callbot.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
        }
    }
}
