//! adaptest-grading — grading service integration.
//!
//! Implements the `GradingClient` trait over HTTP, plus a mock for tests,
//! and loads the `adaptest.toml` configuration.

pub mod config;
pub mod error;
pub mod http;
pub mod mock;

pub use config::{create_client, load_config, AdaptestConfig, GradingConfig};
pub use error::GradingError;
