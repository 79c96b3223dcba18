//! Response collaborator
//!
//! The decision core never builds reply text. The controller asks a
//! `Responder` for it; `TemplateResponder` is the built-in French template
//! set, tuned for short spoken replies.

use crate::error::Result;
use crate::types::{Decision, EmotionLabel, Intent};

/// Spoken when anything in the reply path fails
pub const FALLBACK_REPLY: &str = "Je n'ai pas bien compris, pouvez-vous répéter ?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Opening line of the call
    Welcome,
    /// Automated answer for the decided intent
    Answer,
    /// Transfer notice on escalation
    Handoff,
    /// Garbage or empty transcript
    Repeat,
    /// Goodbye, optionally followed by the satisfaction question
    Goodbye { ask_feedback: bool },
    FeedbackThanks,
    /// Turn limit reached
    Closing,
}

#[derive(Debug, Clone)]
pub struct ReplyRequest<'a> {
    pub kind: ReplyKind,
    pub transcript: &'a str,
    pub decision: Option<&'a Decision>,
    pub emotion: EmotionLabel,
}

impl<'a> ReplyRequest<'a> {
    pub fn new(kind: ReplyKind) -> Self {
        Self {
            kind,
            transcript: "",
            decision: None,
            emotion: EmotionLabel::Neutral,
        }
    }
}

pub trait Responder: Send + Sync {
    fn reply(&self, request: &ReplyRequest<'_>) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct TemplateResponder {
    max_len: usize,
}

impl Default for TemplateResponder {
    fn default() -> Self {
        Self {
            max_len: crate::MAX_VOICE_LENGTH,
        }
    }
}

impl TemplateResponder {
    fn answer(intent: Intent, transcript: &str) -> &'static str {
        match intent {
            Intent::Greeting => "Bonjour ! Comment puis-je vous aider ?",
            Intent::DeclareClaim => {
                "Pour déclarer un sinistre, appelez le service sinistres ou utilisez votre espace client en ligne."
            }
            Intent::CheckStatus => {
                "Le suivi de votre dossier est disponible dans votre espace client, rubrique Mes sinistres."
            }
            Intent::MedicalDocuments => {
                "Envoyez le certificat médical et les justificatifs de soins depuis votre espace client."
            }
            Intent::PaymentInfo => {
                "Pour le suivi de vos remboursements, consultez votre espace client. Le virement part sous 48 heures après accord."
            }
            Intent::UpdateInfo => {
                "Pour modifier vos informations, connectez-vous à votre espace client, rubrique Mon profil."
            }
            Intent::GeneralInfo => "Vos garanties et contrats sont consultables dans votre espace client.",
            _ => Self::keyword_fallback(transcript),
        }
    }

    fn keyword_fallback(transcript: &str) -> &'static str {
        let lowered = transcript.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lowered.contains(w));
        if has(&["modifier", "changer", "information"]) {
            "Pour modifier vos informations, connectez-vous à votre espace client."
        } else if has(&["sinistre", "déclaration", "accident"]) {
            "Pour déclarer un sinistre, utilisez votre espace client en ligne."
        } else if has(&["contrat", "police", "garantie"]) {
            "Consultez vos contrats sur votre espace client."
        } else if has(&["remboursement", "indemnisation", "paiement"]) {
            "Pour le suivi de vos remboursements, consultez votre espace client."
        } else {
            "Je peux vous renseigner sur vos contrats et sinistres. Quelle est votre question ?"
        }
    }
}

fn emotion_prefix(emotion: EmotionLabel) -> &'static str {
    match emotion {
        EmotionLabel::Angry => "Je comprends votre frustration et je suis là pour vous aider. ",
        EmotionLabel::Negative => "Je comprends que cette situation soit difficile. ",
        EmotionLabel::Neutral | EmotionLabel::Positive => "",
    }
}

impl Responder for TemplateResponder {
    fn reply(&self, request: &ReplyRequest<'_>) -> Result<String> {
        let text = match request.kind {
            ReplyKind::Welcome => "Bonjour, je suis l'assistante vocale de votre assurance. Comment puis-je vous aider ?".to_string(),
            ReplyKind::Answer => {
                let intent = request.decision.map(|d| d.intent).unwrap_or(Intent::GeneralInquiry);
                let body = fit_for_voice(Self::answer(intent, request.transcript), self.max_len);
                format!("{}{}", emotion_prefix(request.emotion), body)
            }
            ReplyKind::Handoff => format!(
                "{}Je vous transfère à un conseiller, merci de patienter.",
                emotion_prefix(request.emotion)
            ),
            ReplyKind::Repeat => FALLBACK_REPLY.to_string(),
            ReplyKind::Goodbye { ask_feedback: true } => {
                "Merci pour votre appel. Avant de raccrocher, êtes-vous satisfait de cet échange ? Répondez oui ou non.".to_string()
            }
            ReplyKind::Goodbye { ask_feedback: false } => "Merci pour votre appel. À bientôt !".to_string(),
            ReplyKind::FeedbackThanks => "Merci pour votre retour. Au revoir !".to_string(),
            ReplyKind::Closing => {
                "Nous avons atteint la durée maximale de cet appel. Un conseiller pourra vous recontacter. Au revoir !".to_string()
            }
        };
        Ok(text)
    }
}

/// Shorten an answer for speech: cut at the last sentence end when it keeps
/// at least 60% of the budget, otherwise at the last word boundary.
pub fn fit_for_voice(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }

    let head: String = text.chars().take(max_len).collect();
    if let Some(dot) = head.rfind('.') {
        if head[..dot].chars().count() as f64 > max_len as f64 * 0.6 {
            return head[..=dot].to_string();
        }
    }
    match head.rfind(' ') {
        Some(space) => format!("{}.", head[..space].trim_end_matches([',', ';', ':'])),
        None => format!("{head}."),
    }
}
