//! Signal normalizer: raw collaborator signals → Observation
//!
//! Malformed or missing input is defaulted, never rejected:
//! - missing transcript → empty string
//! - missing or unreadable emotion → NEUTRAL / 0.5
//! - missing or non-finite audio metric → 0.0 (no penalty)

use tracing::debug;

use crate::types::{EmotionLabel, Observation, RawAudio, RawEmotion};

const DEFAULT_EMOTION_SCORE: f64 = 0.5;

#[derive(Debug, Default, Clone, Copy)]
pub struct SignalNormalizer;

impl SignalNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(
        &self,
        transcript: Option<&str>,
        emotion: Option<&RawEmotion>,
        audio: Option<&RawAudio>,
    ) -> Observation {
        let transcript = transcript.map(str::trim).unwrap_or_default().to_string();

        let emotion_label = match emotion.and_then(|e| e.label.as_deref()) {
            Some(raw) => raw.parse::<EmotionLabel>().unwrap_or_else(|err| {
                debug!(%err, "defaulting emotion label to NEUTRAL");
                EmotionLabel::Neutral
            }),
            None => EmotionLabel::Neutral,
        };
        let emotion_score = unit(emotion.and_then(|e| e.score)).unwrap_or(DEFAULT_EMOTION_SCORE);

        let audio = audio.copied().unwrap_or_default();

        Observation {
            transcript,
            emotion_label,
            emotion_score,
            silence_ratio: unit(audio.silence_ratio).unwrap_or(0.0),
            clipping_ratio: unit(audio.clipping_ratio).unwrap_or(0.0),
        }
    }
}

/// Clamp into [0, 1]; non-finite counts as missing
fn unit(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(|v| v.clamp(0.0, 1.0))
}
