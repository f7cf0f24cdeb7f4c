//! Mock grading client for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use adaptest_core::traits::{GradingClient, GradingRequest, GradingResult};

/// A grading client that never touches the network.
///
/// Scores the payload as `answers / total_questions` unless a fixed result is
/// configured, and can be switched into a failing mode.
pub struct MockGradingClient {
    fixed: Option<GradingResult>,
    total_questions: u32,
    passing_score: f64,
    failure: Option<String>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<GradingRequest>>,
}

impl MockGradingClient {
    /// Grade against an exam with the given size and passing score.
    pub fn new(total_questions: u32, passing_score: f64) -> Self {
        Self {
            fixed: None,
            total_questions,
            passing_score,
            failure: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Always return the same result.
    pub fn with_fixed_result(result: GradingResult) -> Self {
        Self {
            total_questions: result.total_questions,
            passing_score: result.passing_score,
            fixed: Some(result),
            ..Self::new(0, 0.0)
        }
    }

    /// Fail every call with the given message.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(0, 0.0)
        }
    }

    /// Get the number of calls made to this client.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this client.
    pub fn last_request(&self) -> Option<GradingRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl GradingClient for MockGradingClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, request: &GradingRequest) -> anyhow::Result<GradingResult> {
        let call = self.call_count.fetch_add(1, Ordering::Relaxed) + 1;
        *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(request.clone());

        if let Some(message) = &self.failure {
            anyhow::bail!("{message}");
        }
        if let Some(result) = &self.fixed {
            return Ok(result.clone());
        }

        let score = if self.total_questions == 0 {
            0.0
        } else {
            request.answers.len() as f64 / self.total_questions as f64 * 100.0
        };
        Ok(GradingResult {
            score,
            total_questions: self.total_questions,
            passing_score: self.passing_score,
            attempt_id: format!("mock-{call}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaptest_core::traits::SubmissionItem;
    use uuid::Uuid;

    fn request(answers: usize) -> GradingRequest {
        GradingRequest {
            exam_id: "geo-101".into(),
            session_id: Uuid::nil(),
            answers: (0..answers)
                .map(|i| SubmissionItem {
                    question_id: format!("q{i}"),
                    answer_text: "A".into(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn scores_by_answer_count() {
        let client = MockGradingClient::new(4, 50.0);
        let result = client.submit(&request(3)).await.unwrap();
        assert_eq!(result.score, 75.0);
        assert!(result.passed());
        assert_eq!(result.attempt_id, "mock-1");
        assert_eq!(client.call_count(), 1);
        assert_eq!(client.last_request().unwrap().answers.len(), 3);
    }

    #[tokio::test]
    async fn fixed_result() {
        let fixed = GradingResult {
            score: 10.0,
            total_questions: 3,
            passing_score: 60.0,
            attempt_id: "fixed".into(),
        };
        let client = MockGradingClient::with_fixed_result(fixed.clone());
        assert_eq!(client.submit(&request(1)).await.unwrap(), fixed);
    }

    #[tokio::test]
    async fn failing_mode_still_counts_calls() {
        let client = MockGradingClient::failing("grader offline");
        let err = client.submit(&request(1)).await.unwrap_err();
        assert!(err.to_string().contains("grader offline"));
        assert_eq!(client.call_count(), 1);
    }
}
