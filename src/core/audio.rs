//! Audio-quality summary over one recorded utterance
//!
//! Silence is measured on 25 ms frames with a 10 ms hop: a frame whose RMS
//! (relative to full scale) is below 0.01 counts as silent. Clipping is the
//! share of samples at or beyond ±32760.

use crate::types::AudioSummary;

const FRAME_MS: u64 = 25;
const HOP_MS: u64 = 10;
const SILENCE_RMS: f64 = 0.01;
const CLIP_LEVEL: i32 = 32_760;
const FULL_SCALE: f64 = 32_768.0;

pub fn compute_audio_summary(samples: &[i16], sample_rate_hz: u32) -> AudioSummary {
    if samples.is_empty() || sample_rate_hz == 0 {
        return AudioSummary {
            sample_rate_hz,
            duration_ms: 0,
            silence_ratio: 1.0,
            clipping_ratio: 0.0,
        };
    }

    let rate = sample_rate_hz as u64;
    let duration_ms = samples.len() as u64 * 1000 / rate;
    let frame = ((rate * FRAME_MS / 1000) as usize).max(1);
    let hop = ((rate * HOP_MS / 1000) as usize).max(1);

    let (silent, frames) = if samples.len() <= frame {
        (usize::from(rms(samples) < SILENCE_RMS), 1)
    } else {
        let mut silent = 0;
        let mut frames = 0;
        let mut start = 0;
        while start + frame <= samples.len() {
            if rms(&samples[start..start + frame]) < SILENCE_RMS {
                silent += 1;
            }
            frames += 1;
            start += hop;
        }
        (silent, frames)
    };

    let clipped = samples
        .iter()
        .filter(|s| (**s as i32).abs() >= CLIP_LEVEL)
        .count();

    AudioSummary {
        sample_rate_hz,
        duration_ms,
        silence_ratio: round3(silent as f64 / frames as f64),
        clipping_ratio: round3(clipped as f64 / samples.len() as f64),
    }
}

fn rms(frame: &[i16]) -> f64 {
    let sum: f64 = frame
        .iter()
        .map(|s| {
            let v = *s as f64 / FULL_SCALE;
            v * v
        })
        .sum();
    (sum / frame.len() as f64).sqrt()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
