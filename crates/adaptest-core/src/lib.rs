//! adaptest-core — Adaptive exam session engine.
//!
//! This crate defines the exam data model, the session state machine, and the
//! timing, scoring and difficulty-adaptation logic the rest of adaptest
//! builds on.

pub mod answers;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod performance;
pub mod report;
pub mod session;
pub mod snapshot;
pub mod timer;
pub mod traits;

pub use engine::{EngineConfig, SessionEngine};
pub use error::{SessionError, SubmitError};
pub use session::{ExamSession, FinalResult, SessionStatus};
