//! Core modules for the callbot

pub mod api;
pub mod audio;
pub mod catalog;
pub mod classifier;
pub mod confidence;
pub mod controller;
pub mod decider;
pub mod engine;
pub mod escalation;
pub mod feedback;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod policy;
pub mod records;
pub mod responder;
pub mod session;
pub mod store;

pub use api::{create_router, run_server, AppState};
pub use audio::compute_audio_summary;
pub use catalog::{CatalogSource, KeywordCatalog};
pub use classifier::{Classification, IntentClassifier};
pub use confidence::ConfidenceEstimator;
pub use controller::{Collaborators, ControllerSettings, TurnController, TurnInput};
pub use decider::{build_decider, Decider, ModelDecider, RulesDecider};
pub use engine::DecisionEngine;
pub use escalation::EscalationOverrides;
pub use feedback::classify_satisfaction;
pub use model::{DecisionModel, OllamaModel};
pub use normalizer::SignalNormalizer;
pub use pipeline::{InputPipeline, ProcessedUtterance, SentimentAnalyzer, Transcriber, Utterance};
pub use policy::{ActionPolicy, PolicyRule};
pub use records::{CallSummary, HandoffDesk, InteractionLog, TurnRecord};
pub use responder::{fit_for_voice, ReplyKind, ReplyRequest, Responder, TemplateResponder, FALLBACK_REPLY};
pub use session::{InMemorySessionStore, SessionStore, SharedController};
pub use store::{run_migrations, SqliteStore};
