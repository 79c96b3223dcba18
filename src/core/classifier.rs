//! Intent/urgency classifier
//!
//! Pure keyword matching over the lowercased utterance. Never fails: weak or
//! empty input only yields weak signals (`unknown`, `low`).

use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

use crate::core::catalog::KeywordCatalog;
use crate::types::{Intent, Urgency};

/// Classifier output for one utterance
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub intent: Intent,
    /// Patterns of the winning intent that matched
    pub hits: usize,
    /// min(1, hits / saturation)
    pub strength: f64,
    pub urgency: Urgency,
}

#[derive(Debug, Clone)]
pub struct IntentClassifier {
    catalog: Arc<KeywordCatalog>,
    saturation_hits: f64,
}

impl IntentClassifier {
    pub fn new(catalog: Arc<KeywordCatalog>, saturation_hits: f64) -> Self {
        Self {
            catalog,
            saturation_hits,
        }
    }

    pub fn catalog(&self) -> &Arc<KeywordCatalog> {
        &self.catalog
    }

    pub fn classify(&self, text: &str) -> Classification {
        let lowered = text.trim().to_lowercase();
        let (intent, hits) = self.intent(&lowered);
        Classification {
            intent,
            hits,
            strength: self.strength(hits),
            urgency: self.urgency(&lowered),
        }
    }

    /// Strictly-greatest hit count wins; ties keep the earlier intent.
    fn intent(&self, lowered: &str) -> (Intent, usize) {
        if lowered.is_empty() {
            return (Intent::Unknown, 0);
        }

        let mut best = (Intent::Unknown, 0);
        for (intent, patterns) in self.catalog.intents() {
            let hits = count_hits(patterns, lowered);
            if hits > best.1 {
                best = (*intent, hits);
            }
        }
        best
    }

    /// High patterns short-circuit medium ones
    fn urgency(&self, lowered: &str) -> Urgency {
        if lowered.is_empty() {
            Urgency::Low
        } else if any_match(self.catalog.urgency_high(), lowered) {
            Urgency::High
        } else if any_match(self.catalog.urgency_med(), lowered) {
            Urgency::Med
        } else {
            Urgency::Low
        }
    }

    fn strength(&self, hits: usize) -> f64 {
        if hits == 0 {
            return 0.0;
        }
        (hits as f64 / self.saturation_hits).min(1.0)
    }
}

fn count_hits(patterns: &[Regex], text: &str) -> usize {
    patterns.iter().filter(|re| re.is_match(text)).count()
}

fn any_match(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|re| re.is_match(text))
}
