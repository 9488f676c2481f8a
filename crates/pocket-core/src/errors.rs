//! Error types for the execution dispatcher
//!
//! Only a handful of these ever reach a caller as `Err`: a sandbox that cannot
//! boot, an operation on a session that was never booted, and invalid
//! configuration. Everything else is folded into `ExecutionResult::error` by the
//! backends so callers have a single field to check per run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Failed to initialize runtime environment: {0}")]
    BackendInitialization(String),
    #[error("Sandbox not initialized")]
    NotInitialized,
    #[error("Judge submission failed: {0}")]
    Submission(String),
    #[error("{0}")]
    ExecutionFailure(String),
    #[error("execution timed out")]
    PollTimeout,
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("Invalid sandbox path: {0}")]
    InvalidPath(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("HTTP request to judge failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("I/O error during sandbox operation: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ExecutorError {
    /// Whether this error is raised to the caller instead of being reported
    /// through an execution result.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExecutorError::BackendInitialization(_)
                | ExecutorError::NotInitialized
                | ExecutorError::Config(_)
        )
    }
}
