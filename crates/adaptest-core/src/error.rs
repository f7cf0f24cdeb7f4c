//! Session error types.
//!
//! Every failure the engine reports is one of these. None of them is fatal:
//! callers recover at the session or request boundary.

use thiserror::Error;

use crate::session::SessionStatus;

/// Errors raised by exam session operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// An operation was invoked with no session loaded.
    #[error("no active exam session")]
    NoActiveSession,

    /// `start` was called while another session is still running.
    #[error("an exam session is already active")]
    SessionActive,

    /// The exam has no questions to present.
    #[error("exam '{0}' has no questions")]
    EmptyExam(String),

    /// A mutation was attempted on a completed session.
    #[error("exam session already completed")]
    AlreadyCompleted,

    /// The session is not in a state that allows this operation.
    #[error("exam session is {actual}, operation requires {required}")]
    InvalidState {
        actual: SessionStatus,
        required: SessionStatus,
    },

    /// `finalize` was called before the session completed.
    #[error("exam session has not completed yet")]
    NotCompleted,

    /// The session cannot be discarded until the grading server acknowledged it.
    #[error("exam results have not been acknowledged by the grading server")]
    NotAcknowledged,

    /// The response does not fit the question it targets.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Final submission with nothing answered.
    #[error("no questions answered; answer at least one question before submitting")]
    NothingAnswered,
}

/// Coarse classification of a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller must restart or reload the session.
    Precondition,
    /// The test-taker can fix the input and try again.
    Validation,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::InvalidResponse(_) | SessionError::NothingAnswered => {
                ErrorKind::Validation
            }
            _ => ErrorKind::Precondition,
        }
    }

    /// Returns `true` if the test-taker can fix this and retry the same session.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

/// Errors raised while submitting final results for grading.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The session rejected the submission before any network call.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Another submission for this engine is still outstanding.
    #[error("a result submission is already in flight")]
    InFlight,

    /// The grading endpoint failed. The local session is left intact.
    #[error("grading submission failed: {0:#}")]
    External(anyhow::Error),
}

impl SubmitError {
    /// Returns `true` if the same submission may simply be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitError::External(_) | SubmitError::InFlight)
    }
}
