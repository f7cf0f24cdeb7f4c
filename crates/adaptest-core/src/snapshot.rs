//! Read-only projections of a session for presenters.
//!
//! Snapshots are owned copies. Holding one never gives access to the live
//! session, and the answer key is never part of it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::difficulty::AdaptiveSettings;
use crate::model::{Question, QuestionKind};
use crate::performance::PerformanceMetrics;
use crate::session::{CompletionReason, SessionStatus};

/// What a presenter may show for the current question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionView {
    pub index: usize,
    pub id: String,
    pub kind: QuestionKind,
    pub prompt: String,
    pub options: Vec<String>,
    pub difficulty: f64,
    pub hints_available: usize,
    /// Hints already revealed through help requests, in order.
    pub hints_revealed: Vec<String>,
}

impl QuestionView {
    pub fn new(index: usize, question: &Question, revealed: usize) -> Self {
        Self {
            index,
            id: question.id.clone(),
            kind: question.kind,
            prompt: question.content.prompt.clone(),
            options: question.content.options.clone(),
            difficulty: question.difficulty,
            hints_available: question.content.hints.len(),
            hints_revealed: question
                .content
                .hints
                .iter()
                .take(revealed)
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub exam_id: String,
    pub status: SessionStatus,
    pub current_index: usize,
    pub total_questions: usize,
    pub answered: usize,
    pub time_allowed_minutes: u32,
    pub time_remaining_secs: u64,
    /// Seconds since the current question was presented.
    pub question_elapsed_secs: u64,
    pub settings: AdaptiveSettings,
    pub metrics: PerformanceMetrics,
    /// `None` once the session has completed.
    pub current_question: Option<QuestionView>,
    pub completion: Option<CompletionReason>,
}
