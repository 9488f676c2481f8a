//! One-call entry point: route a language, build the backend, run, clean up.

use crate::config::PocketConfig;
use crate::errors::ExecutorError;
use crate::executors::{resolve_environment, CodeExecutor, ExecutionResult, RuntimeFactory};

pub struct Dispatcher {
    factory: RuntimeFactory,
}

impl Dispatcher {
    pub fn new(factory: RuntimeFactory) -> Self {
        Self { factory }
    }

    pub fn from_config(config: PocketConfig) -> Self {
        Self::new(RuntimeFactory::new(config))
    }

    /// Execute `code` as `language` on whichever backend the language routes to.
    ///
    /// Sandbox runs get a session of their own that is torn down before this
    /// returns, so concurrent calls never share a sandbox. `Err` means the
    /// backend could not be brought up at all; every other failure is in the
    /// returned result.
    pub async fn run(&self, code: &str, language: &str) -> Result<ExecutionResult, ExecutorError> {
        let env = resolve_environment(language);
        log::debug!("Routing {} to {}", env.language, env.kind);

        let backend = self.factory.create_runtime(&env)?;
        backend.prepare().await?;

        let outcome = backend.execute_code(code, &env.language).await;

        if let Err(e) = backend.release().await {
            log::warn!("Failed to release {} backend: {}", env.kind, e);
        }
        outcome
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(RuntimeFactory::default())
    }
}
