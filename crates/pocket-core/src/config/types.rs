//! Configuration type definitions
//!
//! Every field has a default so an empty YAML document, or no file at all,
//! yields a working configuration pointed at the public judge endpoint.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::ExecutorError;

pub const DEFAULT_JUDGE_API_URL: &str = "https://judge0-ce.p.rapidapi.com";
pub const DEFAULT_JUDGE_API_HOST: &str = "judge0-ce.p.rapidapi.com";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PocketConfig {
    #[serde(default)]
    pub judge: JudgeConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JudgeConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Sent as `X-RapidAPI-Host` alongside the key.
    #[serde(default = "default_api_host")]
    pub api_host: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Judge language id used for languages missing from the built-in table.
    /// Unset means such languages are reported as unsupported.
    #[serde(default)]
    pub default_language_id: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SandboxConfig {
    /// Parent directory for per-session sandbox directories.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
    #[serde(default)]
    pub process_timeout_secs: Option<u64>,
}

fn default_api_url() -> String {
    DEFAULT_JUDGE_API_URL.to_string()
}

fn default_api_host() -> String {
    DEFAULT_JUDGE_API_HOST.to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    30
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            api_host: default_api_host(),
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
            default_language_id: None,
        }
    }
}

impl JudgeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PocketConfig {
    pub fn validate(&self) -> Result<(), ExecutorError> {
        reqwest::Url::parse(&self.judge.api_url).map_err(|e| {
            ExecutorError::Config(format!("Invalid judge api_url '{}': {}", self.judge.api_url, e))
        })?;
        if self.judge.max_attempts == 0 {
            return Err(ExecutorError::Config(
                "judge.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.judge.poll_interval_ms == 0 {
            return Err(ExecutorError::Config(
                "judge.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.sandbox.process_timeout_secs == Some(0) {
            return Err(ExecutorError::Config(
                "sandbox.process_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
