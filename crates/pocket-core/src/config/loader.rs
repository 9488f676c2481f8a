//! Configuration loader for YAML files and environment overrides
//!
//! Precedence, lowest to highest: built-in defaults, the YAML file, then
//! environment variables. String fields in YAML written as `$NAME` are
//! replaced by the value of the `NAME` environment variable when it is set.

use std::env;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;

use crate::config::types::PocketConfig;
use crate::errors::ExecutorError;

pub const ENV_JUDGE_API_URL: &str = "JUDGE0_API_URL";
pub const ENV_JUDGE_API_KEY: &str = "JUDGE0_API_KEY";
pub const ENV_JUDGE_API_HOST: &str = "JUDGE0_API_HOST";
pub const ENV_JUDGE_POLL_INTERVAL_MS: &str = "POCKET_JUDGE_POLL_INTERVAL_MS";
pub const ENV_JUDGE_MAX_ATTEMPTS: &str = "POCKET_JUDGE_MAX_ATTEMPTS";
pub const ENV_SANDBOX_TIMEOUT_SECS: &str = "POCKET_SANDBOX_TIMEOUT_SECS";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the optional file, overlay the environment and validate.
    pub async fn load(path: Option<&Path>) -> Result<PocketConfig, ExecutorError> {
        let mut config = match path {
            Some(path) => Self::from_file(path).await?,
            None => PocketConfig::default(),
        };
        Self::apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<PocketConfig, ExecutorError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            ExecutorError::Config(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<PocketConfig, ExecutorError> {
        let mut config: PocketConfig = if content.trim().is_empty() {
            PocketConfig::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| ExecutorError::Config(format!("Failed to parse YAML: {}", e)))?
        };
        Self::resolve_env_refs(&mut config);
        Ok(config)
    }

    fn resolve_env_refs(config: &mut PocketConfig) {
        for value in [
            &mut config.judge.api_url,
            &mut config.judge.api_key,
            &mut config.judge.api_host,
        ] {
            if let Some(name) = value.strip_prefix('$') {
                if let Ok(resolved) = env::var(name) {
                    *value = resolved;
                }
            }
        }
    }

    pub fn apply_env_overrides(config: &mut PocketConfig) -> Result<(), ExecutorError> {
        if let Some(url) = non_empty_var(ENV_JUDGE_API_URL) {
            config.judge.api_url = url;
        }
        if let Some(key) = non_empty_var(ENV_JUDGE_API_KEY) {
            config.judge.api_key = key;
        }
        if let Some(host) = non_empty_var(ENV_JUDGE_API_HOST) {
            config.judge.api_host = host;
        }
        if let Some(interval) = parse_var(ENV_JUDGE_POLL_INTERVAL_MS)? {
            config.judge.poll_interval_ms = interval;
        }
        if let Some(attempts) = parse_var(ENV_JUDGE_MAX_ATTEMPTS)? {
            config.judge.max_attempts = attempts;
        }
        if let Some(timeout) = parse_var(ENV_SANDBOX_TIMEOUT_SECS)? {
            config.sandbox.process_timeout_secs = Some(timeout);
        }
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, ExecutorError> {
    match non_empty_var(name) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            ExecutorError::Config(format!("Invalid value for {}: '{}'", name, raw))
        }),
        None => Ok(None),
    }
}
