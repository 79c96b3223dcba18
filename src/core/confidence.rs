//! Confidence estimator
//!
//! Additive and clamped, applied in this order:
//! base + weight·strength → intent floor/penalty → audio penalties → clamp → round

use crate::config::ConfidenceTuning;
use crate::types::Intent;

#[derive(Debug, Clone, Default)]
pub struct ConfidenceEstimator {
    tuning: ConfidenceTuning,
}

impl ConfidenceEstimator {
    pub fn new(tuning: ConfidenceTuning) -> Self {
        Self { tuning }
    }

    pub fn estimate(&self, strength: f64, intent: Intent, silence_ratio: f64, clipping_ratio: f64) -> f64 {
        let t = &self.tuning;
        let mut confidence = t.base + t.strength_weight * strength;

        match intent {
            Intent::Greeting => confidence = confidence.max(t.greeting_floor),
            Intent::Unknown => confidence -= t.unknown_penalty,
            _ => {}
        }

        if silence_ratio > t.silence_threshold {
            confidence -= t.silence_penalty;
        }
        if clipping_ratio > t.clipping_threshold {
            confidence -= t.clipping_penalty;
        }

        (confidence.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
    }
}
