//! Grading client error types.

use thiserror::Error;

/// Errors that can occur when talking to the grading service.
#[derive(Debug, Error)]
pub enum GradingError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The grading service does not know the exam.
    #[error("exam not found: {0}")]
    ExamNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl GradingError {
    /// Whether resubmitting the same payload cannot succeed.
    pub fn is_permanent(&self) -> bool {
        match self {
            GradingError::AuthenticationFailed(_) | GradingError::ExamNotFound(_) => true,
            GradingError::ApiError { status, .. } => (400..500).contains(status),
            GradingError::RateLimited { .. }
            | GradingError::Timeout(_)
            | GradingError::NetworkError(_) => false,
        }
    }
}
