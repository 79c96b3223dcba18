//! Satisfaction classification for the post-goodbye question
//!
//! Negative cues are checked first so "pas satisfait" is not read as
//! "satisfait". Anything else is ambiguous and records no score.

use crate::types::SatisfactionScore;

const NEGATIVE: &[&str] = &[
    "pas satisfait",
    "insatisfait",
    "pas content",
    "pas bien",
    "mécontent",
    "mauvais",
    "décevant",
    "nul",
    "non",
];

const POSITIVE: &[&str] = &[
    "très bien",
    "satisfait",
    "parfait",
    "super",
    "génial",
    "excellent",
    "content",
    "bien",
    "merci",
    "oui",
];

pub fn classify_satisfaction(reply: &str) -> Option<SatisfactionScore> {
    let lowered = reply.trim().to_lowercase();
    match lowered.as_str() {
        "" => return None,
        "1" => return Some(SatisfactionScore::Satisfied),
        "2" => return Some(SatisfactionScore::Unsatisfied),
        _ => {}
    }

    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let cue = |cues: &[&str]| {
        cues.iter().any(|c| {
            if c.contains(' ') {
                lowered.contains(c)
            } else {
                tokens.contains(c)
            }
        })
    };

    if cue(NEGATIVE) {
        Some(SatisfactionScore::Unsatisfied)
    } else if cue(POSITIVE) {
        Some(SatisfactionScore::Satisfied)
    } else {
        None
    }
}
