//! Core trait definitions for grading backends.
//!
//! The engine never talks to the network itself. Final results go through a
//! [`GradingClient`], implemented by the `adaptest-grading` crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Grading client trait
// ---------------------------------------------------------------------------

/// Trait for backends that grade a finished exam.
#[async_trait]
pub trait GradingClient: Send + Sync {
    /// Human-readable backend name (e.g. "http").
    fn name(&self) -> &str;

    /// Submit the answered questions for grading.
    async fn submit(&self, request: &GradingRequest) -> anyhow::Result<GradingResult>;
}

/// One answered question in the grading payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionItem {
    pub question_id: String,
    pub answer_text: String,
}

/// Payload sent to the grading endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingRequest {
    /// Exam being graded.
    pub exam_id: String,
    /// Local session identifier, stable across retries.
    pub session_id: Uuid,
    /// Answered questions only, in question order.
    pub answers: Vec<SubmissionItem>,
}

/// Grading endpoint acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    pub score: f64,
    pub total_questions: u32,
    pub passing_score: f64,
    pub attempt_id: String,
}

impl GradingResult {
    pub fn passed(&self) -> bool {
        self.score >= self.passing_score
    }
}
