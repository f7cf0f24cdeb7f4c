//! Answer normalization and storage.
//!
//! A [`RawResponse`] from the presentation layer is normalized exactly once,
//! here, into a gradable [`AnswerAttempt`]. The [`AnswerStore`] keeps every
//! attempt ever made plus a sparse index of the latest attempt per question.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::model::{Question, QuestionKind, RawAnswer, RawResponse, FALSE_LABEL, TRUE_LABEL};
use crate::traits::SubmissionItem;

/// Lowest accepted confidence self-report.
pub const MIN_CONFIDENCE: u8 = 1;
/// Highest accepted confidence self-report.
pub const MAX_CONFIDENCE: u8 = 5;

/// Separator used when a multi-choice selection is rendered as answer text.
const MULTI_SEPARATOR: &str = ", ";

/// One graded answer. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerAttempt {
    pub id: Uuid,
    pub question_id: String,
    pub question_index: usize,
    pub submitted_at: DateTime<Utc>,
    /// Normalized answer: option label(s) or verbatim text.
    pub answer: String,
    pub correct: bool,
    pub time_spent_secs: u64,
    pub confidence: u8,
    /// Whether a hint was requested before submission.
    pub hint_used: bool,
}

/// Normalize a raw response against its question.
///
/// Returns `Ok(None)` for the "no answer" sentinel, which is never graded.
/// `help_requested` is OR-ed into the response's own hint flag.
pub fn normalize(
    question: &Question,
    response: &RawResponse,
    help_requested: bool,
) -> Result<Option<AnswerAttempt>, SessionError> {
    if !response.answer.is_answered() {
        return Ok(None);
    }

    if !(MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&response.confidence) {
        return Err(SessionError::InvalidResponse(format!(
            "confidence must be between {MIN_CONFIDENCE} and {MAX_CONFIDENCE}, got {}",
            response.confidence
        )));
    }

    let canonical = question.content.correct_answer.values();
    // An empty answer key matches nothing.
    let keyed = !canonical.is_empty();

    let (answer, correct) = match (question.kind, &response.answer) {
        (QuestionKind::SingleChoice, RawAnswer::Choice { index }) => {
            let label = option_label(question, *index)?;
            let correct = keyed && canonical.iter().all(|c| *c == label);
            (label.to_string(), correct)
        }
        (QuestionKind::SingleChoice, RawAnswer::MultiChoice { indices }) => {
            if indices.is_empty() {
                return Err(SessionError::InvalidResponse(format!(
                    "question '{}': empty selection",
                    question.id
                )));
            }
            let unique: BTreeSet<usize> = indices.iter().copied().collect();
            let labels = unique
                .into_iter()
                .map(|i| option_label(question, i))
                .collect::<Result<Vec<_>, _>>()?;
            let correct = keyed && canonical.iter().all(|c| labels.contains(c));
            (labels.join(MULTI_SEPARATOR), correct)
        }
        (QuestionKind::TrueFalse, RawAnswer::TrueFalse { value }) => {
            let label = if *value { TRUE_LABEL } else { FALSE_LABEL };
            let correct = keyed && canonical.iter().all(|c| *c == label);
            (label.to_string(), correct)
        }
        (QuestionKind::FreeText, RawAnswer::FreeText { text }) => {
            // Exact, case-sensitive comparison. No trimming or folding.
            let correct = keyed && canonical.iter().all(|c| *c == text.as_str());
            (text.clone(), correct)
        }
        (kind, other) => {
            return Err(SessionError::InvalidResponse(format!(
                "question '{}' is {kind}, got {other:?}",
                question.id
            )));
        }
    };

    Ok(Some(AnswerAttempt {
        id: Uuid::new_v4(),
        question_id: question.id.clone(),
        question_index: response.question_index,
        submitted_at: Utc::now(),
        answer,
        correct,
        time_spent_secs: response.time_spent_secs,
        confidence: response.confidence,
        hint_used: response.hint_used || help_requested,
    }))
}

fn option_label(question: &Question, index: usize) -> Result<&str, SessionError> {
    question
        .content
        .options
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| {
            SessionError::InvalidResponse(format!(
                "question '{}' has {} options, got index {index}",
                question.id,
                question.content.options.len()
            ))
        })
}

/// Ordered, sparse collection of attempts keyed by question position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerStore {
    /// Every attempt, in submission order.
    history: Vec<AnswerAttempt>,
    /// Question index → position in `history` of the attempt that counts.
    latest: BTreeMap<usize, usize>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attempt. Returns `true` if it superseded an earlier attempt
    /// for the same question; the earlier one stays in the history.
    pub fn record(&mut self, attempt: AnswerAttempt) -> bool {
        let position = self.history.len();
        let question_index = attempt.question_index;
        self.history.push(attempt);
        self.latest.insert(question_index, position).is_some()
    }

    /// The attempt that currently counts for a question, if any.
    pub fn latest(&self, question_index: usize) -> Option<&AnswerAttempt> {
        self.latest.get(&question_index).map(|&pos| &self.history[pos])
    }

    /// Attempts that count for scoring, in question order.
    pub fn graded(&self) -> impl Iterator<Item = &AnswerAttempt> {
        self.latest.values().map(|&pos| &self.history[pos])
    }

    pub fn answered_count(&self) -> usize {
        self.latest.len()
    }

    pub fn is_answered(&self, question_index: usize) -> bool {
        self.latest.contains_key(&question_index)
    }

    /// Every attempt ever recorded, including superseded ones.
    pub fn history(&self) -> &[AnswerAttempt] {
        &self.history
    }

    /// Build the grading payload: one entry per answered question, in order.
    ///
    /// Fails with [`SessionError::NothingAnswered`] when the payload would be empty.
    pub fn submission_payload(&self) -> Result<Vec<SubmissionItem>, SessionError> {
        let items: Vec<SubmissionItem> = self
            .graded()
            .map(|a| SubmissionItem {
                question_id: a.question_id.clone(),
                answer_text: a.answer.clone(),
            })
            .collect();

        if items.is_empty() {
            return Err(SessionError::NothingAnswered);
        }
        Ok(items)
    }
}
