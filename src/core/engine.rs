//! Decision engine: normalizer → decider → override layer
//!
//! Stateless and synchronous. The same inputs always give the same routed
//! decision (for the rules decider), so one engine is shared by every call.

use std::sync::Arc;
use tracing::{debug, error};

use crate::config::{CallbotConfig, OverrideTuning};
use crate::core::catalog::{CatalogSource, KeywordCatalog};
use crate::core::decider::{build_decider, Decider, RulesDecider};
use crate::core::escalation::EscalationOverrides;
use crate::core::normalizer::SignalNormalizer;
use crate::error::Result;
use crate::types::{Decision, Observation, RawAudio, RawEmotion, RoutedDecision};

pub struct DecisionEngine {
    normalizer: SignalNormalizer,
    decider: Box<dyn Decider>,
    overrides: EscalationOverrides,
}

impl DecisionEngine {
    pub fn new(decider: Box<dyn Decider>, overrides: EscalationOverrides) -> Self {
        Self {
            normalizer: SignalNormalizer::new(),
            decider,
            overrides,
        }
    }

    /// Rules decider over the built-in catalog and default thresholds
    pub fn with_defaults() -> Self {
        let config = CallbotConfig::default();
        let catalog = KeywordCatalog::french_insurance();
        Self::new(
            Box::new(RulesDecider::from_config(&config, Arc::clone(&catalog))),
            EscalationOverrides::new(OverrideTuning::default(), catalog),
        )
    }

    pub fn from_config(config: &CallbotConfig) -> Result<Self> {
        let catalog = match &config.catalog.path {
            Some(path) => Arc::new(KeywordCatalog::compile(&CatalogSource::from_file(path)?)?),
            None => KeywordCatalog::french_insurance(),
        };
        Ok(Self::new(
            build_decider(config, Arc::clone(&catalog)),
            EscalationOverrides::new(config.overrides.clone(), catalog),
        ))
    }

    pub fn decider_name(&self) -> &'static str {
        self.decider.name()
    }

    pub fn observe(
        &self,
        transcript: Option<&str>,
        emotion: Option<&RawEmotion>,
        audio: Option<&RawAudio>,
    ) -> Observation {
        self.normalizer.normalize(transcript, emotion, audio)
    }

    /// Base decision plus overrides. The decision is schema-checked on both
    /// sides of the override layer.
    pub fn route(&self, observation: &Observation) -> Result<RoutedDecision> {
        let base = self.decider.decide(observation)?;
        base.validate()
            .inspect_err(|err| error!(decider = self.decider.name(), %err, "base decision rejected"))?;

        let routed = self.overrides.apply(base, observation);
        routed.decision.validate()?;

        debug!(
            intent = %routed.decision.intent,
            urgency = %routed.decision.urgency,
            action = %routed.decision.action,
            confidence = routed.decision.confidence,
            route = routed.route.as_str(),
            "decision"
        );
        Ok(routed)
    }

    /// Normalize raw signals and route them
    pub fn evaluate(
        &self,
        transcript: Option<&str>,
        emotion: Option<&RawEmotion>,
        audio: Option<&RawAudio>,
    ) -> Result<RoutedDecision> {
        self.route(&self.observe(transcript, emotion, audio))
    }

    /// Final decision for raw signals
    pub fn decide(
        &self,
        transcript: Option<&str>,
        emotion: Option<&RawEmotion>,
        audio: Option<&RawAudio>,
    ) -> Result<Decision> {
        Ok(self.evaluate(transcript, emotion, audio)?.decision)
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallbotError;
    use crate::types::{Action, Intent, Route};

    struct BrokenDecider;

    impl Decider for BrokenDecider {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn decide(&self, _observation: &Observation) -> Result<Decision> {
            Ok(Decision::new(Intent::Greeting, crate::types::Urgency::Low, Action::RagQuery, 1.5))
        }
    }

    #[test]
    fn test_out_of_range_decision_is_schema_violation() {
        let engine = DecisionEngine::new(
            Box::new(BrokenDecider),
            EscalationOverrides::new(OverrideTuning::default(), KeywordCatalog::french_insurance()),
        );
        let err = engine.evaluate(Some("bonjour"), None, None).unwrap_err();
        assert!(matches!(err, CallbotError::SchemaViolation(_)));
    }

    #[test]
    fn test_missing_everything_still_decides() {
        let routed = DecisionEngine::with_defaults().evaluate(None, None, None).unwrap();
        assert_eq!(routed.decision.intent, Intent::Unknown);
        assert_eq!(routed.route, Route::Respond);
    }

    #[test]
    fn test_missing_catalog_file_is_config_error() {
        let mut config = CallbotConfig::default();
        config.catalog.path = Some("/nonexistent/catalog.toml".into());
        assert!(matches!(
            DecisionEngine::from_config(&config),
            Err(CallbotError::Config(_))
        ));
    }
}
