//! Core data model types for adaptest.
//!
//! These are the immutable inputs to an exam session: the exam definition,
//! its questions, and the raw responses produced by the presentation layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Label a true/false question uses for "true".
pub const TRUE_LABEL: &str = "True";
/// Label a true/false question uses for "false".
pub const FALSE_LABEL: &str = "False";

/// A complete exam as supplied by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamDefinition {
    /// Unique identifier for this exam.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Total time allowed, in minutes.
    pub duration_minutes: u32,
    /// Score (0-100) required to pass.
    #[serde(default = "default_passing_score")]
    pub passing_score_percent: f64,
    /// The questions, in presentation order.
    #[serde(default)]
    pub questions: Vec<Question>,
}

fn default_passing_score() -> f64 {
    60.0
}

/// A single question. Immutable once the session has started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Identifier, unique within the exam.
    pub id: String,
    /// Which kind of response this question accepts.
    pub kind: QuestionKind,
    /// Difficulty rating, higher is harder.
    #[serde(default = "default_difficulty")]
    pub difficulty: f64,
    /// Prompt, options, answer key, hints and explanation.
    pub content: QuestionContent,
    /// Informational metadata. Never used in scoring.
    #[serde(default)]
    pub metadata: QuestionMetadata,
}

fn default_difficulty() -> f64 {
    1.0
}

/// The supported question kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    TrueFalse,
    FreeText,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::SingleChoice => write!(f, "single_choice"),
            QuestionKind::TrueFalse => write!(f, "true_false"),
            QuestionKind::FreeText => write!(f, "free_text"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "single_choice" | "choice" | "mcq" => Ok(QuestionKind::SingleChoice),
            "true_false" | "boolean" => Ok(QuestionKind::TrueFalse),
            "free_text" | "text" => Ok(QuestionKind::FreeText),
            other => Err(format!("unknown question kind: {other}")),
        }
    }
}

/// The canonical answer for a question.
///
/// Most questions have one correct label or text. Multi-correct choice
/// questions list several labels, and a response is only correct when it
/// selects every one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CanonicalAnswer {
    Single(String),
    Multiple(Vec<String>),
}

impl CanonicalAnswer {
    /// All canonical values, in definition order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            CanonicalAnswer::Single(s) => vec![s.as_str()],
            CanonicalAnswer::Multiple(v) => v.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, CanonicalAnswer::Multiple(v) if v.len() > 1)
    }
}

/// Everything shown to (or withheld from) the test-taker for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionContent {
    pub prompt: String,
    /// Choice labels for single-choice and true/false questions.
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: CanonicalAnswer,
    /// Hints, revealed in order on request.
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionMetadata {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub subtopic: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub skill_tier: Option<String>,
}

/// A response as produced by the presentation layer, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    /// Position of the question being answered.
    pub question_index: usize,
    pub answer: RawAnswer,
    /// Self-reported confidence, 1-5.
    pub confidence: u8,
    /// Whether the test-taker looked at a hint before answering.
    #[serde(default)]
    pub hint_used: bool,
    /// Seconds the test-taker spent on this question.
    pub time_spent_secs: u64,
}

/// The raw answer value, tagged by the question kind it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawAnswer {
    /// Index into the question's options.
    Choice { index: usize },
    /// Several indices, for multi-correct choice questions.
    MultiChoice { indices: Vec<usize> },
    TrueFalse { value: bool },
    /// Verbatim text.
    FreeText { text: String },
    /// Nothing was answered. Never graded.
    NoAnswer,
}

impl RawAnswer {
    pub fn is_answered(&self) -> bool {
        !matches!(self, RawAnswer::NoAnswer)
    }
}
