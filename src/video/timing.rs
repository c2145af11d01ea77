//! Word-level caption timing estimated from narration text.
//!
//! Timings come from a fixed speaking-rate model, not from aligning the
//! synthesized audio, so captions can drift on unusually short or long
//! words.

use serde::{Deserialize, Serialize};

/// Shortest time any single word stays on screen.
pub const MIN_WORD_SECONDS: f64 = 0.3;
/// Display time contributed by each character of a word.
pub const SECONDS_PER_CHAR: f64 = 0.05;
/// Silence inserted between consecutive words.
pub const WORD_GAP_SECONDS: f64 = 0.05;

/// Estimated display window for one caption word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
    pub index: usize,
}

impl WordTiming {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Estimate start/end offsets for every whitespace-separated word.
///
/// Deterministic; empty or whitespace-only text yields an empty timeline.
pub fn estimate(narration: &str) -> Vec<WordTiming> {
    let mut offset = 0.0;

    narration
        .split_whitespace()
        .enumerate()
        .map(|(index, word)| {
            let duration = word_duration(word);
            let timing = WordTiming {
                word: word.to_string(),
                start: offset,
                end: offset + duration,
                index,
            };
            offset += duration + WORD_GAP_SECONDS;
            timing
        })
        .collect()
}

fn word_duration(word: &str) -> f64 {
    (word.chars().count() as f64 * SECONDS_PER_CHAR).max(MIN_WORD_SECONDS)
}

/// End of the last word, or zero for an empty timeline.
pub fn total_span(timings: &[WordTiming]) -> f64 {
    timings.last().map(|t| t.end).unwrap_or(0.0)
}
