//! Decision strategies
//!
//! `RulesDecider` is the deterministic classifier → confidence → policy chain.
//! `ModelDecider` asks a language model for the same four-key decision and
//! falls back to the rules when the model cannot be reached. Which one runs
//! is chosen by `[decider] mode`.

use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::config::{CallbotConfig, DeciderMode};
use crate::core::catalog::KeywordCatalog;
use crate::core::classifier::IntentClassifier;
use crate::core::confidence::ConfidenceEstimator;
use crate::core::model::{DecisionModel, OllamaModel};
use crate::core::policy::ActionPolicy;
use crate::error::{CallbotError, Result};
use crate::types::{Decision, Intent, Observation};

pub trait Decider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Base decision for one observation, before overrides
    fn decide(&self, observation: &Observation) -> Result<Decision>;
}

// =============================================================================
// RULES
// =============================================================================

#[derive(Debug, Clone)]
pub struct RulesDecider {
    classifier: IntentClassifier,
    estimator: ConfidenceEstimator,
    policy: ActionPolicy,
}

impl RulesDecider {
    pub fn new(classifier: IntentClassifier, estimator: ConfidenceEstimator, policy: ActionPolicy) -> Self {
        Self {
            classifier,
            estimator,
            policy,
        }
    }

    pub fn from_config(config: &CallbotConfig, catalog: Arc<KeywordCatalog>) -> Self {
        Self::new(
            IntentClassifier::new(catalog, config.confidence.saturation_hits),
            ConfidenceEstimator::new(config.confidence.clone()),
            ActionPolicy::new(config.policy.clone()),
        )
    }
}

impl Decider for RulesDecider {
    fn name(&self) -> &'static str {
        "rules"
    }

    fn decide(&self, observation: &Observation) -> Result<Decision> {
        let classification = self.classifier.classify(&observation.transcript);
        let confidence = self.estimator.estimate(
            classification.strength,
            classification.intent,
            observation.silence_ratio,
            observation.clipping_ratio,
        );
        let (action, rule) = self
            .policy
            .decide(classification.urgency, classification.intent, confidence);
        debug!(intent = %classification.intent, confidence, ?rule, %action, "policy rule applied");

        Ok(Decision::new(
            classification.intent,
            classification.urgency,
            action,
            confidence,
        ))
    }
}

// =============================================================================
// MODEL
// =============================================================================

pub struct ModelDecider {
    model: Box<dyn DecisionModel>,
    fallback: RulesDecider,
}

impl ModelDecider {
    pub fn new(model: Box<dyn DecisionModel>, fallback: RulesDecider) -> Self {
        Self { model, fallback }
    }

    pub fn prompt(observation: &Observation) -> String {
        let intents = Intent::ALL
            .iter()
            .filter(|i| **i != Intent::GeneralInquiry)
            .map(|i| i.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "You route calls for a French insurance support line.\n\
             Reply with ONE JSON object and nothing else, with exactly these keys:\n\
             {{\"intent\": one of [{intents}],\n \
             \"urgency\": \"low\" | \"med\" | \"high\",\n \
             \"action\": \"rag_query\" | \"escalate\",\n \
             \"confidence\": number between 0 and 1}}\n\
             Use \"high\" urgency for medical emergencies and \"escalate\" when a human is required.\n\n\
             emotion: {} (score {:.2})\n\
             audio: silence_ratio={:.3} clipping_ratio={:.3}\n\
             caller: \"{}\"\n",
            observation.emotion_label,
            observation.emotion_score,
            observation.silence_ratio,
            observation.clipping_ratio,
            observation.transcript.replace('"', "'"),
        )
    }
}

impl Decider for ModelDecider {
    fn name(&self) -> &'static str {
        "model"
    }

    fn decide(&self, observation: &Observation) -> Result<Decision> {
        let raw = match self.model.generate(&Self::prompt(observation)) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(model = self.model.name(), %err, "model unavailable, using rules");
                return self.fallback.decide(observation);
            }
        };

        extract_json(&raw)
            .ok_or_else(|| CallbotError::SchemaViolation(format!("no JSON object in `{raw}`")))
            .and_then(Decision::from_json)
            .inspect_err(|err| error!(model = self.model.name(), %err, "model produced invalid decision"))
    }
}

/// Outermost `{...}` span; models like to wrap JSON in prose or fences
fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Build the decider selected by configuration
pub fn build_decider(config: &CallbotConfig, catalog: Arc<KeywordCatalog>) -> Box<dyn Decider> {
    let rules = RulesDecider::from_config(config, catalog);
    match config.decider.mode {
        DeciderMode::Rules => Box::new(rules),
        DeciderMode::Model => Box::new(ModelDecider::new(
            Box::new(OllamaModel::from_config(&config.decider)),
            rules,
        )),
    }
}
