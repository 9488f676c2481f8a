//! Normalized execution result shared by every backend.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Outcome of one execution, regardless of which backend produced it.
///
/// `error` is set exactly when the run did not complete successfully.
/// `execution_time_ms` is always measured locally, from just before the backend
/// starts work to just after the result is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub execution_time_ms: u64,
}

impl ExecutionResult {
    pub fn success(output: impl Into<String>, exit_code: Option<i32>, started: Instant) -> Self {
        Self {
            output: output.into(),
            error: None,
            exit_code,
            execution_time_ms: elapsed_ms(started),
        }
    }

    pub fn failure(error: impl Into<String>, exit_code: Option<i32>, started: Instant) -> Self {
        Self {
            output: String::new(),
            error: Some(error.into()),
            exit_code,
            execution_time_ms: elapsed_ms(started),
        }
    }

    /// Result for a process that ran to completion. A non-zero status keeps the
    /// captured output and reports the status as the error.
    pub fn from_process(output: String, exit_code: i32, started: Instant) -> Self {
        let error = (exit_code != 0).then(|| format!("process exited with code {}", exit_code));
        Self {
            output,
            error,
            exit_code: Some(exit_code),
            execution_time_ms: elapsed_ms(started),
        }
    }

    /// Result for a run that failed before producing any output.
    pub fn from_error(err: &dyn std::fmt::Display, started: Instant) -> Self {
        let message = err.to_string();
        let message = if message.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            message
        };
        Self::failure(message, None, started)
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
