//! Handoff ticket passed to the human-agent desk

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::types::{Decision, EscalationReason, Observation, ReasonCode, Urgency};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueType {
    Urgent,
    Standard,
}

impl QueueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueType::Urgent => "urgent",
            QueueType::Standard => "standard",
        }
    }
}

/// Created only on escalation; immutable afterwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffTicket {
    pub reason: String,
    pub queue_type: QueueType,
    pub key_information: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl HandoffTicket {
    /// Build the ticket for an escalated turn. High urgency and distress
    /// go to the urgent queue.
    pub fn for_escalation(
        reason: &EscalationReason,
        decision: &Decision,
        observation: &Observation,
        turn_number: u32,
    ) -> Self {
        let queue_type = if decision.urgency == Urgency::High
            || reason.code == ReasonCode::R103_EMOTIONAL_DISTRESS
        {
            QueueType::Urgent
        } else {
            QueueType::Standard
        };

        let mut key_information = BTreeMap::new();
        key_information.insert("intent".into(), Value::from(decision.intent.as_str()));
        key_information.insert("urgency".into(), Value::from(decision.urgency.as_str()));
        key_information.insert("confidence".into(), Value::from(decision.confidence));
        key_information.insert("emotion".into(), Value::from(observation.emotion_label.as_str()));
        key_information.insert("emotion_score".into(), Value::from(observation.emotion_score));
        key_information.insert("reason_code".into(), Value::from(reason.code.code()));
        key_information.insert("last_message".into(), Value::from(observation.transcript.clone()));
        key_information.insert("turn_number".into(), Value::from(turn_number));

        Self {
            reason: reason.message.clone(),
            queue_type,
            key_information,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, EmotionLabel, Intent};

    fn observation(label: EmotionLabel, score: f64) -> Observation {
        Observation {
            transcript: "je veux parler à mon avocat".into(),
            emotion_label: label,
            emotion_score: score,
            silence_ratio: 0.0,
            clipping_ratio: 0.0,
        }
    }

    #[test]
    fn test_high_urgency_goes_to_urgent_queue() {
        let decision = Decision::new(Intent::DeclareClaim, Urgency::High, Action::Escalate, 0.8);
        let reason = EscalationReason::new(ReasonCode::R102_HIGH_URGENCY);
        let ticket = HandoffTicket::for_escalation(&reason, &decision, &observation(EmotionLabel::Neutral, 0.5), 2);
        assert_eq!(ticket.queue_type, QueueType::Urgent);
        assert_eq!(ticket.reason, "high urgency");
        assert_eq!(ticket.key_information["turn_number"], Value::from(2));
    }

    #[test]
    fn test_keyword_escalation_is_standard_queue() {
        let decision = Decision::new(Intent::LegalIssue, Urgency::Low, Action::Escalate, 0.7);
        let reason = EscalationReason::sensitive_keyword("avocat");
        let ticket = HandoffTicket::for_escalation(&reason, &decision, &observation(EmotionLabel::Neutral, 0.5), 1);
        assert_eq!(ticket.queue_type, QueueType::Standard);
        assert_eq!(ticket.key_information["intent"], Value::from("legal_issue"));
        assert_eq!(
            ticket.key_information["last_message"],
            Value::from("je veux parler à mon avocat")
        );
    }
}
