//! Input pipeline: recorded utterance → `TurnInput`
//!
//! Two branches run concurrently on the blocking pool and are joined before
//! the turn proceeds:
//! - text: speech-to-text, then sentiment on the transcript
//! - audio: silence/clipping summary
//!
//! There is no partial-result path. A failing collaborator yields its default
//! (empty transcript, NEUTRAL/0.5) and the turn continues.

use std::sync::Arc;
use tracing::warn;

use crate::core::audio::compute_audio_summary;
use crate::core::controller::TurnInput;
use crate::error::Result;
use crate::types::{AudioSummary, RawAudio, RawEmotion};

pub trait Transcriber: Send + Sync {
    fn transcribe(&self, samples: &[i16], sample_rate_hz: u32) -> Result<String>;
}

pub trait SentimentAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Result<RawEmotion>;
}

/// Mono PCM recording of one caller turn
#[derive(Debug, Clone)]
pub struct Utterance {
    pub samples: Arc<[i16]>,
    pub sample_rate_hz: u32,
}

impl Utterance {
    pub fn new(samples: Vec<i16>, sample_rate_hz: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate_hz,
        }
    }
}

/// Everything the pipeline measured for one utterance
#[derive(Debug, Clone)]
pub struct ProcessedUtterance {
    pub transcript: String,
    pub emotion: RawEmotion,
    pub audio: AudioSummary,
}

impl From<ProcessedUtterance> for TurnInput {
    fn from(processed: ProcessedUtterance) -> Self {
        TurnInput {
            transcript: Some(processed.transcript),
            emotion: Some(processed.emotion),
            audio: Some(RawAudio::from(processed.audio)),
        }
    }
}

#[derive(Clone)]
pub struct InputPipeline {
    transcriber: Arc<dyn Transcriber>,
    sentiment: Arc<dyn SentimentAnalyzer>,
}

impl InputPipeline {
    pub fn new(transcriber: Arc<dyn Transcriber>, sentiment: Arc<dyn SentimentAnalyzer>) -> Self {
        Self {
            transcriber,
            sentiment,
        }
    }

    pub async fn process(&self, utterance: Utterance) -> ProcessedUtterance {
        let text_branch = {
            let transcriber = Arc::clone(&self.transcriber);
            let sentiment = Arc::clone(&self.sentiment);
            let samples = Arc::clone(&utterance.samples);
            let rate = utterance.sample_rate_hz;
            tokio::task::spawn_blocking(move || {
                let transcript = transcriber.transcribe(&samples, rate).unwrap_or_else(|err| {
                    warn!(%err, "transcription failed, using empty transcript");
                    String::new()
                });
                let emotion = if transcript.trim().is_empty() {
                    neutral()
                } else {
                    sentiment.analyze(&transcript).unwrap_or_else(|err| {
                        warn!(%err, "sentiment analysis failed, using NEUTRAL");
                        neutral()
                    })
                };
                (transcript, emotion)
            })
        };

        let audio_branch = {
            let samples = Arc::clone(&utterance.samples);
            let rate = utterance.sample_rate_hz;
            tokio::task::spawn_blocking(move || compute_audio_summary(&samples, rate))
        };

        let (text, audio) = tokio::join!(text_branch, audio_branch);

        let (transcript, emotion) = text.unwrap_or_else(|err| {
            warn!(%err, "text branch panicked");
            (String::new(), neutral())
        });
        let audio = audio.unwrap_or_else(|err| {
            warn!(%err, "audio branch panicked");
            compute_audio_summary(&[], utterance.sample_rate_hz)
        });

        ProcessedUtterance {
            transcript,
            emotion,
            audio,
        }
    }
}

fn neutral() -> RawEmotion {
    RawEmotion::new("NEUTRAL", 0.5)
}
