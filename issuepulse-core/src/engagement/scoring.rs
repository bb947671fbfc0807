//! Engagement score formula (pure math, no DB).
//!
//! ```text
//! frequency = min(1.0, count * 0.2)              saturates at 5 interactions
//! recency   = exp(-0.05 * days_since_last)       1.0 today, ~0.50 at 14 days
//! score     = clamp(0.4 * frequency + 0.6 * recency, 0.0, 1.0)
//! ```
//!
//! Recency carries the larger weight: one interaction today outranks many
//! interactions a month ago.

use crate::error::{Error, Result};
use crate::format::days_between;
use chrono::{DateTime, Utc};

/// Frequency credit per interaction.
pub const FREQUENCY_STEP: f64 = 0.2;
/// Weight of the frequency component.
pub const FREQUENCY_WEIGHT: f64 = 0.4;
/// Weight of the recency component.
pub const RECENCY_WEIGHT: f64 = 0.6;
/// Exponential decay rate per day of inactivity.
pub const RECENCY_DECAY_RATE: f64 = 0.05;
/// Stored context strings are cut to this many characters.
pub const MAX_CONTEXT_CHARS: usize = 200;

/// `min(1.0, count * 0.2)`; non-positive counts score zero.
pub fn frequency_score(count: i64) -> f64 {
    (count.max(0) as f64 * FREQUENCY_STEP).min(1.0)
}

/// `exp(-0.05 * days)`; negative ages are treated as zero.
pub fn recency_score(days_since_last: f64) -> f64 {
    (-RECENCY_DECAY_RATE * days_since_last.max(0.0)).exp()
}

/// Score for `count` interactions, the latest at `last_interaction`, evaluated at `now`.
pub fn compute_score(count: i64, last_interaction: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = days_between(last_interaction, now);
    blend(frequency_score(count), recency_score(days))
}

fn blend(frequency: f64, recency: f64) -> f64 {
    (frequency * FREQUENCY_WEIGHT + recency * RECENCY_WEIGHT).clamp(0.0, 1.0)
}

/// Apply one multiplicative decay step: `score * (1 - decay_factor)`.
pub fn decayed(score: f64, decay_factor: f64) -> f64 {
    (score * (1.0 - decay_factor)).clamp(0.0, 1.0)
}

/// Reject scores outside [0, 1] (including NaN).
pub fn check_score(score: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&score) {
        Ok(score)
    } else {
        Err(Error::Validation(format!(
            "engagement score {} outside [0, 1]",
            score
        )))
    }
}
