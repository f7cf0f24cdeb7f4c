//! Performance tracking.
//!
//! Folds each graded attempt into the session's rolling metrics. Every update
//! produces a fresh [`PerformanceMetrics`] value; nothing is mutated in place.

use serde::{Deserialize, Serialize};

use crate::answers::AnswerAttempt;

/// Comprehension bump for a correct attempt.
const COMPREHENSION_GAIN: f64 = 10.0;
/// Comprehension penalty for an incorrect attempt.
const COMPREHENSION_LOSS: f64 = 5.0;

/// Aggregate metrics for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Smoothed understanding indicator, 0-100.
    pub comprehension_rate: f64,
    /// Running mean of correctness, 0-100.
    pub accuracy_rate: f64,
    /// Total graded attempts.
    pub attempts_count: u32,
    /// Most recent self-reported confidence (0 before any attempt).
    pub confidence_level: u8,
    /// Cumulative seconds across all attempts.
    pub completion_time_secs: u64,
}

/// Fold one attempt into the prior metrics.
///
/// The accuracy mean is re-weighted with the pre-increment attempt count, so
/// after N attempts it equals `100 * correct / N` whatever the order.
pub fn record_attempt(prior: &PerformanceMetrics, attempt: &AnswerAttempt) -> PerformanceMetrics {
    let attempts_count = prior.attempts_count + 1;
    let outcome = if attempt.correct { 100.0 } else { 0.0 };
    let accuracy_rate =
        (prior.accuracy_rate * prior.attempts_count as f64 + outcome) / attempts_count as f64;

    let delta = if attempt.correct {
        COMPREHENSION_GAIN
    } else {
        -COMPREHENSION_LOSS
    };
    let comprehension_rate = (prior.comprehension_rate + delta).clamp(0.0, 100.0);

    PerformanceMetrics {
        comprehension_rate,
        accuracy_rate: accuracy_rate.clamp(0.0, 100.0),
        attempts_count,
        confidence_level: attempt.confidence,
        completion_time_secs: prior.completion_time_secs + attempt.time_spent_secs,
    }
}
