//! Difficulty adaptation.
//!
//! Maps the current performance metrics to the next [`AdaptiveSettings`]
//! snapshot. All clamping happens in [`DifficultyLevel`], so no caller can
//! produce an out-of-range level.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::answers::{AnswerAttempt, MAX_CONFIDENCE};
use crate::performance::PerformanceMetrics;

pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 5.0;

/// Below this level the test-taker is flagged for additional support.
const SUPPORT_THRESHOLD: f64 = 2.0;

/// Seconds above which pace is considered slow.
const SLOW_PACE_SECS: u64 = 120;
/// Seconds below which pace is considered fast.
const FAST_PACE_SECS: u64 = 60;

/// Accommodations enabled by an explicit help request.
pub const HELP_ACCOMMODATIONS: [Accommodation; 2] =
    [Accommodation::ExtendedTime, Accommodation::VisualAids];

/// Weights of the composite performance score.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub comprehension: f64,
    pub accuracy: f64,
    pub confidence: f64,
    pub attempts: f64,
}

pub const SCORE_WEIGHTS: ScoreWeights = ScoreWeights {
    comprehension: 0.30,
    accuracy: 0.30,
    confidence: 0.20,
    attempts: 0.20,
};

/// A difficulty rating, always within `[1, 5]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct DifficultyLevel(f64);

impl DifficultyLevel {
    /// Clamp `value` into range. NaN maps to the minimum.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(MIN_DIFFICULTY);
        }
        Self(value.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    fn shifted(self, delta: f64) -> Self {
        Self::new(self.0 + delta)
    }
}

impl Default for DifficultyLevel {
    fn default() -> Self {
        Self(MIN_DIFFICULTY)
    }
}

impl From<f64> for DifficultyLevel {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<DifficultyLevel> for f64 {
    fn from(level: DifficultyLevel) -> Self {
        level.0
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// How quickly the test-taker is answering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacePreference {
    Slow,
    #[default]
    Medium,
    Fast,
}

impl PacePreference {
    pub fn from_time_spent(secs: u64) -> Self {
        if secs > SLOW_PACE_SECS {
            PacePreference::Slow
        } else if secs < FAST_PACE_SECS {
            PacePreference::Fast
        } else {
            PacePreference::Medium
        }
    }
}

impl fmt::Display for PacePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacePreference::Slow => write!(f, "slow"),
            PacePreference::Medium => write!(f, "medium"),
            PacePreference::Fast => write!(f, "fast"),
        }
    }
}

/// A named support feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accommodation {
    ExtendedTime,
    VisualAids,
}

impl fmt::Display for Accommodation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accommodation::ExtendedTime => write!(f, "extended time"),
            Accommodation::VisualAids => write!(f, "visual aids"),
        }
    }
}

/// Adaptive settings snapshot. Replaced wholesale on every step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveSettings {
    pub difficulty: DifficultyLevel,
    pub pace: PacePreference,
    /// Sticky: once set it stays set for the session.
    pub requires_additional_support: bool,
    /// Grows only.
    pub accommodations: BTreeSet<Accommodation>,
}

impl AdaptiveSettings {
    pub fn new(initial_difficulty: f64) -> Self {
        Self {
            difficulty: DifficultyLevel::new(initial_difficulty),
            ..Self::default()
        }
    }

    /// Settings after an explicit help request.
    pub fn with_help(&self) -> Self {
        let mut accommodations = self.accommodations.clone();
        accommodations.extend(HELP_ACCOMMODATIONS);
        Self {
            requires_additional_support: true,
            accommodations,
            ..self.clone()
        }
    }
}

/// Weighted composite of the metrics, 0-100.
pub fn performance_score(metrics: &PerformanceMetrics) -> f64 {
    let w = SCORE_WEIGHTS;
    let normalized_attempts =
        (1.0 - (metrics.attempts_count as f64 - 1.0) * 0.2).clamp(0.0, 1.0);
    let confidence = metrics.confidence_level as f64 / MAX_CONFIDENCE as f64 * 100.0;

    metrics.comprehension_rate * w.comprehension
        + metrics.accuracy_rate * w.accuracy
        + confidence * w.confidence
        + normalized_attempts * 100.0 * w.attempts
}

/// Tiered step from the current level, first matching tier wins.
pub fn next_difficulty(score: f64, current: DifficultyLevel) -> DifficultyLevel {
    if score >= 90.0 {
        current.shifted(0.5)
    } else if score >= 75.0 {
        current
    } else if score >= 60.0 {
        current.shifted(-0.3)
    } else {
        current.shifted(-0.5)
    }
}

/// Produce the next settings snapshot after `last` was folded into `metrics`.
pub fn adjust(
    metrics: &PerformanceMetrics,
    prior: &AdaptiveSettings,
    last: &AnswerAttempt,
) -> AdaptiveSettings {
    let difficulty = next_difficulty(performance_score(metrics), prior.difficulty);
    let requires_additional_support = prior.requires_additional_support
        || last.hint_used
        || difficulty.value() < SUPPORT_THRESHOLD;

    AdaptiveSettings {
        difficulty,
        pace: PacePreference::from_time_spent(last.time_spent_secs),
        requires_additional_support,
        accommodations: prior.accommodations.clone(),
    }
}
