//! Escalation override layer
//!
//! Second pass over the base decision. The garbage check short-circuits to a
//! repeat request; the remaining checks are independent and each one that
//! fires overwrites the stored reason, so the last match wins. When nothing
//! fires the action is forced back to `rag_query`.

use std::sync::Arc;
use tracing::debug;

use crate::config::OverrideTuning;
use crate::core::catalog::KeywordCatalog;
use crate::types::{
    Action, Decision, EscalationReason, Intent, Observation, ReasonCode, RoutedDecision, Route,
    Urgency,
};

#[derive(Debug, Clone)]
pub struct EscalationOverrides {
    tuning: OverrideTuning,
    catalog: Arc<KeywordCatalog>,
}

impl EscalationOverrides {
    pub fn new(tuning: OverrideTuning, catalog: Arc<KeywordCatalog>) -> Self {
        Self { tuning, catalog }
    }

    pub fn apply(&self, base: Decision, observation: &Observation) -> RoutedDecision {
        let lowered = observation.transcript.to_lowercase();

        if self.is_garbage(&base, &lowered) {
            debug!(transcript = %observation.transcript, "unrecognized input, asking to repeat");
            return RoutedDecision {
                decision: Decision {
                    action: Action::RagQuery,
                    ..base
                },
                route: Route::Repeat,
            };
        }

        let t = &self.tuning;
        let mut reason: Option<EscalationReason> = None;

        if base.action == Action::Escalate && base.confidence > t.policy_escalate_above {
            reason = Some(EscalationReason::new(ReasonCode::R101_POLICY_REQUESTED));
        }
        if base.urgency == Urgency::High {
            reason = Some(EscalationReason::new(ReasonCode::R102_HIGH_URGENCY));
        }
        if observation.is_distressed(t.emotion_score_above) {
            reason = Some(EscalationReason::new(ReasonCode::R103_EMOTIONAL_DISTRESS));
        }
        if t.agent_intents.contains(&base.intent) {
            reason = Some(EscalationReason::new(ReasonCode::R104_INTENT_REQUIRES_AGENT));
        }
        if let Some(keyword) = self.catalog.find_sensitive(&lowered) {
            reason = Some(EscalationReason::sensitive_keyword(keyword));
        }

        match reason {
            Some(reason) => RoutedDecision {
                decision: Decision {
                    action: Action::Escalate,
                    ..base
                },
                route: Route::Escalate { reason },
            },
            None => RoutedDecision {
                decision: Decision {
                    action: Action::RagQuery,
                    ..base
                },
                route: Route::Respond,
            },
        }
    }

    /// No known word, and either a very short single word with low
    /// confidence or an unknown intent the policy wanted to escalate.
    fn is_garbage(&self, base: &Decision, lowered: &str) -> bool {
        if self.catalog.has_known_word(lowered) {
            return false;
        }
        let t = &self.tuning;
        let mut words = lowered.split_whitespace();
        let single_short_word = match (words.next(), words.next()) {
            (Some(word), None) => word.chars().count() < t.garbage_word_max_len,
            _ => false,
        };

        (single_short_word && base.confidence < t.garbage_single_word_conf_below)
            || (base.intent == Intent::Unknown
                && base.action == Action::Escalate
                && base.confidence < t.garbage_unknown_conf_below)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EmotionLabel;

    fn overrides() -> EscalationOverrides {
        EscalationOverrides::new(OverrideTuning::default(), KeywordCatalog::french_insurance())
    }

    fn obs(text: &str) -> Observation {
        Observation {
            transcript: text.into(),
            emotion_label: EmotionLabel::Neutral,
            emotion_score: 0.5,
            silence_ratio: 0.0,
            clipping_ratio: 0.0,
        }
    }

    #[test]
    fn test_nothing_fires_forces_rag_query() {
        let base = Decision::new(Intent::MedicalDocuments, Urgency::Low, Action::Escalate, 0.15);
        let routed = overrides().apply(base, &obs("quels documents pour mon dossier"));
        assert_eq!(routed.route, Route::Respond);
        assert_eq!(routed.decision.action, Action::RagQuery);
    }

    #[test]
    fn test_policy_requested_escalation() {
        let base = Decision::new(Intent::MedicalDocuments, Urgency::Low, Action::Escalate, 0.6);
        let routed = overrides().apply(base, &obs("quels documents"));
        assert_eq!(routed.reason().unwrap().code, ReasonCode::R101_POLICY_REQUESTED);
        assert_eq!(routed.decision.action, Action::Escalate);
    }

    #[test]
    fn test_last_matching_reason_wins() {
        let base = Decision::new(Intent::DeclareClaim, Urgency::High, Action::Escalate, 0.83);
        let routed = overrides().apply(base, &obs("j'ai eu un accident grave, urgence, ambulance"));
        assert_eq!(routed.reason().unwrap().message, "sensitive keyword: urgence");
    }

    #[test]
    fn test_distress_reason() {
        let base = Decision::new(Intent::CheckStatus, Urgency::Low, Action::RagQuery, 0.8);
        let mut o = obs("où en est mon dossier");
        o.emotion_label = EmotionLabel::Angry;
        o.emotion_score = 0.95;
        let routed = overrides().apply(base, &o);
        assert_eq!(routed.reason().unwrap().code, ReasonCode::R103_EMOTIONAL_DISTRESS);
        assert_eq!(routed.reason().unwrap().message, "emotional distress");
    }

    #[test]
    fn test_agent_intent_overrides_rag_query() {
        let base = Decision::new(Intent::ContractCancellation, Urgency::Low, Action::RagQuery, 0.7);
        let routed = overrides().apply(base, &obs("je veux résilier"));
        assert_eq!(routed.reason().unwrap().code, ReasonCode::R104_INTENT_REQUIRES_AGENT);
    }

    #[test]
    fn test_short_garbage_is_repeat() {
        let base = Decision::new(Intent::Unknown, Urgency::Low, Action::Escalate, 0.1);
        let routed = overrides().apply(base, &obs("xyz"));
        assert_eq!(routed.route, Route::Repeat);
        assert!(routed.reason().is_none());
    }

    #[test]
    fn test_short_known_word_is_not_garbage() {
        let base = Decision::new(Intent::Unknown, Urgency::Low, Action::Escalate, 0.1);
        let routed = overrides().apply(base, &obs("oui"));
        assert_ne!(routed.route, Route::Repeat);
    }

    #[test]
    fn test_long_unknown_low_confidence_is_repeat() {
        let base = Decision::new(Intent::Unknown, Urgency::Low, Action::Escalate, 0.1);
        let routed = overrides().apply(base, &obs("blorp fizz wabble"));
        assert_eq!(routed.route, Route::Repeat);
    }

    #[test]
    fn test_raising_urgency_never_removes_escalation() {
        let o = obs("quels documents");
        let intents = [
            Intent::MedicalDocuments,
            Intent::GeneralInfo,
            Intent::CheckStatus,
            Intent::Complaint,
            Intent::ContractCancellation,
        ];
        let pairs = [
            (Urgency::Low, Urgency::Med),
            (Urgency::Med, Urgency::High),
            (Urgency::Low, Urgency::High),
        ];
        let mut escalations = 0;
        for intent in intents {
            for conf in [0.1, 0.35, 0.5, 0.7, 0.9] {
                for action in [Action::RagQuery, Action::Escalate] {
                    for (lower, higher) in pairs {
                        let low = overrides().apply(Decision::new(intent, lower, action, conf), &o);
                        let high = overrides().apply(Decision::new(intent, higher, action, conf), &o);
                        assert!(
                            !low.route.is_escalation() || high.route.is_escalation(),
                            "{intent:?} {conf} {action:?} {lower:?}->{higher:?}"
                        );
                        if low.route.is_escalation() {
                            escalations += 1;
                        }
                    }
                }
            }
        }
        // the grid must contain escalating cases for the property to mean anything
        assert!(escalations > 0);
    }

    #[test]
    fn test_raising_confidence_never_removes_escalation() {
        let o = obs("quels documents");
        for intent in [Intent::MedicalDocuments, Intent::GeneralInfo, Intent::CheckStatus] {
            for urgency in [Urgency::Low, Urgency::Med] {
                let confidences = [0.1, 0.3, 0.5, 0.51, 0.7, 0.95];
                for pair in confidences.windows(2) {
                    let low = overrides().apply(Decision::new(intent, urgency, Action::Escalate, pair[0]), &o);
                    let high = overrides().apply(Decision::new(intent, urgency, Action::Escalate, pair[1]), &o);
                    assert!(
                        !low.route.is_escalation() || high.route.is_escalation(),
                        "{intent:?} {urgency:?} {} -> {}",
                        pair[0],
                        pair[1]
                    );
                }
            }
        }
    }
}
