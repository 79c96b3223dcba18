//! Per-turn input bundle and the raw collaborator signals it is built from

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Emotion label from the sentiment collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmotionLabel {
    Negative,
    Neutral,
    Positive,
    Angry,
}

impl EmotionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negative => "NEGATIVE",
            Self::Neutral => "NEUTRAL",
            Self::Positive => "POSITIVE",
            Self::Angry => "ANGRY",
        }
    }

    /// NEGATIVE and ANGRY count toward emotional distress
    pub fn is_distressed(&self) -> bool {
        matches!(self, Self::Negative | Self::Angry)
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEGATIVE" | "NEG" => Ok(Self::Negative),
            "NEUTRAL" | "NEU" => Ok(Self::Neutral),
            "POSITIVE" | "POS" => Ok(Self::Positive),
            "ANGRY" | "ANGER" => Ok(Self::Angry),
            other => Err(format!("unknown emotion label `{other}`")),
        }
    }
}

/// Emotion as reported upstream. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEmotion {
    #[serde(default, alias = "sentiment")]
    pub label: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

impl RawEmotion {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: Some(label.into()),
            score: Some(score),
        }
    }
}

/// Audio-quality metrics as reported upstream. Missing fields mean no penalty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAudio {
    #[serde(default)]
    pub silence_ratio: Option<f64>,
    #[serde(default)]
    pub clipping_ratio: Option<f64>,
}

impl RawAudio {
    pub fn new(silence_ratio: f64, clipping_ratio: f64) -> Self {
        Self {
            silence_ratio: Some(silence_ratio),
            clipping_ratio: Some(clipping_ratio),
        }
    }
}

impl From<AudioSummary> for RawAudio {
    fn from(summary: AudioSummary) -> Self {
        Self::new(summary.silence_ratio, summary.clipping_ratio)
    }
}

/// Output of the audio-quality analysis over one recorded utterance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioSummary {
    pub sample_rate_hz: u32,
    pub duration_ms: u64,
    pub silence_ratio: f64,
    pub clipping_ratio: f64,
}

/// Normalized per-turn observation. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub transcript: String,
    pub emotion_label: EmotionLabel,
    /// 0.0-1.0
    pub emotion_score: f64,
    /// 0.0-1.0
    pub silence_ratio: f64,
    /// 0.0-1.0
    pub clipping_ratio: f64,
}

impl Observation {
    /// Strong negative emotion above `threshold`
    pub fn is_distressed(&self, threshold: f64) -> bool {
        self.emotion_label.is_distressed() && self.emotion_score > threshold
    }
}
