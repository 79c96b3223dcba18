//! Integration tests for the decision engine
//!
//! Tests full transcript → routed decision flow: classifier, confidence,
//! action policy and escalation overrides together.

use pretty_assertions::assert_eq;
use std::sync::Arc;

use callbot::config::{CallbotConfig, DeciderMode};
use callbot::core::catalog::IntentPatterns;
use callbot::core::{
    CatalogSource, DecisionEngine, DecisionModel, EscalationOverrides, IntentClassifier, KeywordCatalog,
    ModelDecider, RulesDecider, ConfidenceEstimator, ActionPolicy,
};
use callbot::types::{Action, Intent, RawAudio, RawEmotion, ReasonCode, Route, Urgency};
use callbot::CallbotError;

fn engine() -> DecisionEngine {
    DecisionEngine::with_defaults()
}

fn neutral() -> RawEmotion {
    RawEmotion::new("NEUTRAL", 0.5)
}

fn clean_audio() -> RawAudio {
    RawAudio::new(0.0, 0.0)
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_greeting_is_answered_with_high_confidence() {
    let routed = engine()
        .evaluate(Some("Bonjour"), Some(&neutral()), Some(&clean_audio()))
        .unwrap();

    assert_eq!(routed.decision.intent, Intent::Greeting);
    assert!(routed.decision.confidence >= 0.85);
    assert_eq!(routed.decision.action, Action::RagQuery);
    assert_eq!(routed.route, Route::Respond);
}

#[test]
fn test_serious_accident_escalates() {
    let routed = engine()
        .evaluate(
            Some("j'ai eu un accident grave, urgence, ambulance"),
            Some(&neutral()),
            Some(&clean_audio()),
        )
        .unwrap();

    assert_eq!(routed.decision.urgency, Urgency::High);
    assert_eq!(routed.decision.action, Action::Escalate);
    assert!(routed.route.is_escalation());
}

#[test]
fn test_short_garbage_with_poor_audio_asks_to_repeat() {
    let routed = engine()
        .evaluate(Some("xyz"), Some(&neutral()), Some(&RawAudio::new(0.8, 0.1)))
        .unwrap();

    assert_eq!(routed.decision.intent, Intent::Unknown);
    assert!(routed.decision.confidence < 0.20);
    assert_eq!(routed.route, Route::Repeat);
    assert!(routed.reason().is_none());
}

#[test]
fn test_lawyer_mention_escalates_with_keyword() {
    let routed = engine()
        .evaluate(Some("je veux parler à mon avocat"), Some(&neutral()), Some(&clean_audio()))
        .unwrap();

    assert_eq!(routed.decision.action, Action::Escalate);
    let reason = routed.reason().unwrap();
    assert_eq!(reason.code, ReasonCode::R105_SENSITIVE_KEYWORD);
    assert!(reason.message.contains("avocat"));
}

#[test]
fn test_distressed_caller_escalates() {
    let routed = engine()
        .evaluate(
            Some("où en est mon dossier"),
            Some(&RawEmotion::new("ANGRY", 0.95)),
            Some(&clean_audio()),
        )
        .unwrap();

    assert_eq!(routed.reason().unwrap().code, ReasonCode::R103_EMOTIONAL_DISTRESS);
}

#[test]
fn test_mild_negative_emotion_does_not_escalate() {
    let routed = engine()
        .evaluate(
            Some("où en est mon dossier"),
            Some(&RawEmotion::new("NEGATIVE", 0.6)),
            Some(&clean_audio()),
        )
        .unwrap();

    assert_eq!(routed.decision.intent, Intent::CheckStatus);
    assert_eq!(routed.route, Route::Respond);
}

#[test]
fn test_cancellation_needs_an_agent() {
    let routed = engine().evaluate(Some("je veux résilier, quel est le préavis"), None, None).unwrap();

    assert_eq!(routed.decision.intent, Intent::ContractCancellation);
    assert_eq!(routed.reason().unwrap().code, ReasonCode::R104_INTENT_REQUIRES_AGENT);
}

#[test]
fn test_missing_signals_use_defaults() {
    let with_defaults = engine().evaluate(Some("quelles sont mes garanties"), None, None).unwrap();
    let explicit = engine()
        .evaluate(Some("quelles sont mes garanties"), Some(&neutral()), Some(&clean_audio()))
        .unwrap();

    assert_eq!(with_defaults, explicit);
}

// ============================================================================
// PROPERTIES
// ============================================================================

const TRANSCRIPTS: &[&str] = &[
    "",
    "   ",
    "Bonjour",
    "xyz",
    "oui",
    "j'ai eu un accident grave, urgence, ambulance",
    "je veux déclarer un sinistre",
    "où en est mon dossier",
    "je veux parler à mon avocat",
    "c'est inadmissible, je suis furieux",
    "quels documents dois-je envoyer",
    "mon père est décédé",
    "blorp fizz wabble",
    "au revoir",
];

#[test]
fn test_every_decision_is_in_range() {
    let engine = engine();
    let audios = [RawAudio::new(0.0, 0.0), RawAudio::new(0.9, 0.0), RawAudio::new(0.9, 0.5)];

    for text in TRANSCRIPTS {
        for audio in &audios {
            let routed = engine.evaluate(Some(text), None, Some(audio)).unwrap();
            let d = routed.decision;
            assert!((0.0..=1.0).contains(&d.confidence), "{text}: {}", d.confidence);
            assert_eq!(d.confidence, (d.confidence * 1000.0).round() / 1000.0);
            assert!(d.validate().is_ok());
            assert_eq!(d.action == Action::Escalate, routed.route.is_escalation(), "{text}");
        }
    }
}

#[test]
fn test_decisions_are_deterministic() {
    let engine = engine();
    let emotion = RawEmotion::new("NEGATIVE", 0.7);
    let audio = RawAudio::new(0.3, 0.02);

    for text in TRANSCRIPTS {
        let first = engine.evaluate(Some(text), Some(&emotion), Some(&audio)).unwrap();
        let second = engine.evaluate(Some(text), Some(&emotion), Some(&audio)).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_high_urgency_always_escalates() {
    let engine = engine();
    for text in ["urgence", "il est à l'hôpital", "fracture du bras, quelles garanties"] {
        let routed = engine.evaluate(Some(text), None, None).unwrap();
        assert_eq!(routed.decision.urgency, Urgency::High, "{text}");
        assert!(routed.route.is_escalation(), "{text}");
    }
}

// ============================================================================
// CATALOG SUBSTITUTION
// ============================================================================

fn english_catalog() -> CatalogSource {
    CatalogSource {
        urgency_high: vec![r"\bbleeding\b".into()],
        urgency_med: vec![r"\bpain\b".into()],
        sensitive_keywords: vec!["lawyer".into()],
        vocabulary: vec!["hello".into(), "yes".into()],
        intents: vec![
            IntentPatterns {
                intent: Intent::Greeting,
                patterns: vec![r"\bhello\b".into()],
            },
            IntentPatterns {
                intent: Intent::DeclareClaim,
                patterns: vec![r"\bcrash\b".into(), r"\bclaim\b".into()],
            },
        ],
    }
}

fn engine_with(source: &CatalogSource) -> DecisionEngine {
    let config = CallbotConfig::default();
    let catalog = Arc::new(KeywordCatalog::compile(source).unwrap());
    DecisionEngine::new(
        Box::new(RulesDecider::new(
            IntentClassifier::new(Arc::clone(&catalog), config.confidence.saturation_hits),
            ConfidenceEstimator::new(config.confidence.clone()),
            ActionPolicy::new(config.policy.clone()),
        )),
        EscalationOverrides::new(config.overrides.clone(), catalog),
    )
}

#[test]
fn test_injected_catalog_replaces_builtin_tables() {
    let engine = engine_with(&english_catalog());

    let claim = engine.evaluate(Some("I had a crash, I want to open a claim"), None, None).unwrap();
    assert_eq!(claim.decision.intent, Intent::DeclareClaim);
    assert_eq!(claim.route, Route::Respond);

    let french = engine.evaluate(Some("Bonjour"), None, None).unwrap();
    assert_eq!(french.decision.intent, Intent::Unknown);

    let lawyer = engine.evaluate(Some("I will call my lawyer"), None, None).unwrap();
    assert_eq!(lawyer.reason().unwrap().message, "sensitive keyword: lawyer");

    let bleeding = engine.evaluate(Some("he is bleeding"), None, None).unwrap();
    assert_eq!(bleeding.decision.urgency, Urgency::High);
}

#[test]
fn test_catalog_loaded_from_config_file() {
    let path = std::env::temp_dir().join(format!("callbot_catalog_{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, toml::to_string(&english_catalog()).unwrap()).unwrap();

    let mut config = CallbotConfig::default();
    config.catalog.path = Some(path.clone());
    let engine = DecisionEngine::from_config(&config).unwrap();
    let routed = engine.evaluate(Some("hello"), None, None).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(routed.decision.intent, Intent::Greeting);
    assert_eq!(routed.decision.confidence, 0.85);
}

#[test]
fn test_invalid_catalog_pattern_is_rejected() {
    let mut source = english_catalog();
    source.urgency_med.push("(unclosed".into());

    let err = KeywordCatalog::compile(&source).unwrap_err();
    assert!(matches!(err, CallbotError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
}

// ============================================================================
// MODEL DECIDER
// ============================================================================

struct CannedModel(Result<String, String>);

impl DecisionModel for CannedModel {
    fn name(&self) -> &str {
        "canned"
    }

    fn generate(&self, _prompt: &str) -> callbot::Result<String> {
        self.0.clone().map_err(CallbotError::Model)
    }
}

fn model_engine(reply: Result<String, String>) -> DecisionEngine {
    let mut config = CallbotConfig::default();
    config.decider.mode = DeciderMode::Model;
    let catalog = KeywordCatalog::french_insurance();
    DecisionEngine::new(
        Box::new(ModelDecider::new(
            Box::new(CannedModel(reply)),
            RulesDecider::from_config(&config, Arc::clone(&catalog)),
        )),
        EscalationOverrides::new(config.overrides.clone(), catalog),
    )
}

#[test]
fn test_model_decision_goes_through_overrides() {
    let engine = model_engine(Ok(
        r#"{"intent":"check_status","urgency":"low","action":"rag_query","confidence":0.9}"#.into(),
    ));
    assert_eq!(engine.decider_name(), "model");

    let routed = engine.evaluate(Some("où en est mon dossier"), None, None).unwrap();
    assert_eq!(routed.decision.intent, Intent::CheckStatus);
    assert_eq!(routed.route, Route::Respond);

    let routed = engine.evaluate(Some("j'appelle mon avocat"), None, None).unwrap();
    assert_eq!(routed.decision.action, Action::Escalate);
}

#[test]
fn test_unreachable_model_falls_back_to_rules() {
    let engine = model_engine(Err("connection refused".into()));
    let routed = engine.evaluate(Some("Bonjour"), None, None).unwrap();
    assert_eq!(routed.decision.intent, Intent::Greeting);
    assert_eq!(routed.decision.confidence, 0.85);
}

#[test]
fn test_malformed_model_output_is_a_schema_violation() {
    for reply in [
        "I think this is a claim",
        r#"{"intent":"check_status","urgency":"low","action":"rag_query"}"#,
        r#"{"intent":"check_status","urgency":"urgent","action":"rag_query","confidence":0.9}"#,
        r#"{"intent":"check_status","urgency":"low","action":"rag_query","confidence":1.7}"#,
    ] {
        let err = model_engine(Ok(reply.into()))
            .evaluate(Some("où en est mon dossier"), None, None)
            .unwrap_err();
        assert!(err.is_schema_violation(), "{reply}: {err}");
    }
}
