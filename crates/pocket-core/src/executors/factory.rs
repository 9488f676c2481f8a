//! Backend construction from a routing decision.

use async_trait::async_trait;
use std::sync::Arc;

use super::judge::RemoteJudgeExecutor;
use super::native_sandbox::NativeSandbox;
use super::router::{RuntimeEnvironment, RuntimeKind};
use super::sandbox::{LocalSandboxExecutor, SandboxProvider};
use super::{CodeExecutor, ExecutionResult};
use crate::config::{ConfigLoader, PocketConfig};
use crate::errors::ExecutorError;

/// One of the two execution strategies, usable through [`CodeExecutor`]
/// without knowing which.
pub enum Backend {
    LocalSandbox(LocalSandboxExecutor),
    RemoteJudge(RemoteJudgeExecutor),
}

impl Backend {
    pub fn kind(&self) -> RuntimeKind {
        match self {
            Backend::LocalSandbox(_) => RuntimeKind::LocalSandbox,
            Backend::RemoteJudge(_) => RuntimeKind::RemoteJudge,
        }
    }

    /// Make the backend ready to execute. Only the sandbox has anything to do.
    pub async fn prepare(&self) -> Result<(), ExecutorError> {
        match self {
            Backend::LocalSandbox(sandbox) => sandbox.initialize().await,
            Backend::RemoteJudge(_) => Ok(()),
        }
    }

    pub async fn release(&self) -> Result<(), ExecutorError> {
        match self {
            Backend::LocalSandbox(sandbox) => sandbox.cleanup().await,
            Backend::RemoteJudge(_) => Ok(()),
        }
    }
}

#[async_trait]
impl CodeExecutor for Backend {
    async fn execute_code(
        &self,
        code: &str,
        language: &str,
    ) -> Result<ExecutionResult, ExecutorError> {
        match self {
            Backend::LocalSandbox(sandbox) => sandbox.execute_code(code, language).await,
            Backend::RemoteJudge(judge) => judge.execute_code(code, language).await,
        }
    }
}

/// Builds backends from routing decisions using one configuration.
pub struct RuntimeFactory {
    config: PocketConfig,
    sandbox_provider: Arc<dyn SandboxProvider>,
}

impl RuntimeFactory {
    pub fn new(config: PocketConfig) -> Self {
        let sandbox_provider = Arc::new(NativeSandbox::from_config(&config.sandbox));
        Self {
            config,
            sandbox_provider,
        }
    }

    /// Built-in defaults with the judge/sandbox environment variables applied.
    pub fn from_env() -> Result<Self, ExecutorError> {
        let mut config = PocketConfig::default();
        ConfigLoader::apply_env_overrides(&mut config)?;
        Ok(Self::new(config))
    }

    pub fn with_sandbox_provider(mut self, provider: Arc<dyn SandboxProvider>) -> Self {
        self.sandbox_provider = provider;
        self
    }

    pub fn config(&self) -> &PocketConfig {
        &self.config
    }

    /// A fresh, uninitialized sandbox session or a judge client. Nothing is
    /// booted or contacted here.
    pub fn create_runtime(&self, env: &RuntimeEnvironment) -> Result<Backend, ExecutorError> {
        match env.kind {
            RuntimeKind::LocalSandbox => Ok(Backend::LocalSandbox(LocalSandboxExecutor::new(
                Arc::clone(&self.sandbox_provider),
            ))),
            RuntimeKind::RemoteJudge => Ok(Backend::RemoteJudge(RemoteJudgeExecutor::from_config(
                &self.config.judge,
            )?)),
        }
    }
}

impl Default for RuntimeFactory {
    /// Same as [`RuntimeFactory::from_env`], except that an unparsable numeric
    /// variable is logged and the remaining settings are still applied.
    fn default() -> Self {
        let mut config = PocketConfig::default();
        if let Err(e) = ConfigLoader::apply_env_overrides(&mut config) {
            log::warn!("Ignoring environment configuration: {}", e);
        }
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::router::resolve_environment;
    use crate::config::{ENV_JUDGE_API_KEY, ENV_JUDGE_API_URL, ENV_JUDGE_MAX_ATTEMPTS};
    use crate::executors::sandbox::SessionStatus;
    use serial_test::serial;
    use std::env;

    fn clear_judge_env() {
        for name in [ENV_JUDGE_API_URL, ENV_JUDGE_API_KEY, ENV_JUDGE_MAX_ATTEMPTS] {
            env::remove_var(name);
        }
    }

    fn judge_url(factory: &RuntimeFactory) -> String {
        match factory.create_runtime(&resolve_environment("python")).unwrap() {
            Backend::RemoteJudge(judge) => judge.api_url().to_string(),
            Backend::LocalSandbox(_) => panic!("expected a judge client"),
        }
    }

    #[tokio::test]
    async fn test_sandbox_languages_get_uninitialized_sessions() {
        let factory = RuntimeFactory::default();
        let backend = factory.create_runtime(&resolve_environment("TypeScript")).unwrap();
        assert_eq!(backend.kind(), RuntimeKind::LocalSandbox);
        match &backend {
            Backend::LocalSandbox(session) => {
                assert_eq!(session.status().await, SessionStatus::Uninitialized)
            }
            Backend::RemoteJudge(_) => panic!("expected a sandbox session"),
        }
    }

    #[test]
    fn test_other_languages_get_judge_client_from_config() {
        let mut config = PocketConfig::default();
        config.judge.api_url = "http://judge.local:2358/".to_string();
        let factory = RuntimeFactory::new(config);

        let backend = factory.create_runtime(&resolve_environment("python")).unwrap();
        match backend {
            Backend::RemoteJudge(judge) => assert_eq!(judge.api_url(), "http://judge.local:2358"),
            Backend::LocalSandbox(_) => panic!("expected a judge client"),
        }
    }

    #[test]
    #[serial]
    fn test_default_factory_points_at_public_judge() {
        clear_judge_env();
        let factory = RuntimeFactory::default();
        let backend = factory.create_runtime(&resolve_environment("cobol")).unwrap();
        match backend {
            Backend::RemoteJudge(judge) => {
                assert_eq!(judge.api_url(), crate::config::DEFAULT_JUDGE_API_URL)
            }
            Backend::LocalSandbox(_) => panic!("expected a judge client"),
        }
    }

    #[test]
    #[serial]
    fn test_default_factory_reads_judge_environment() {
        clear_judge_env();
        env::set_var(ENV_JUDGE_API_URL, "http://judge.from-env:2358");
        env::set_var(ENV_JUDGE_API_KEY, "env-key");
        let factory = RuntimeFactory::default();
        let from_env = RuntimeFactory::from_env().map(|f| judge_url(&f));
        clear_judge_env();

        assert_eq!(judge_url(&factory), "http://judge.from-env:2358");
        assert_eq!(factory.config().judge.api_key, "env-key");
        assert_eq!(from_env.unwrap(), "http://judge.from-env:2358");
    }

    #[test]
    #[serial]
    fn test_bad_environment_number() {
        clear_judge_env();
        env::set_var(ENV_JUDGE_API_URL, "http://judge.from-env:2358");
        env::set_var(ENV_JUDGE_MAX_ATTEMPTS, "many");
        let strict = RuntimeFactory::from_env();
        let lenient = RuntimeFactory::default();
        clear_judge_env();

        assert!(matches!(strict, Err(ExecutorError::Config(_))));
        assert_eq!(judge_url(&lenient), "http://judge.from-env:2358");
        assert_eq!(lenient.config().judge.max_attempts, 30);
    }

    #[tokio::test]
    async fn test_uninitialized_sandbox_backend_raises() {
        let backend = RuntimeFactory::default()
            .create_runtime(&resolve_environment("javascript"))
            .unwrap();
        let err = backend.execute_code("1", "javascript").await.unwrap_err();
        assert!(matches!(err, ExecutorError::NotInitialized));
    }
}
