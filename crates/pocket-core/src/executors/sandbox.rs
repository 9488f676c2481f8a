//! Local sandbox backend.
//!
//! The sandbox itself is an external capability described by
//! [`SandboxProvider`] and [`SandboxHandle`]; this module owns the session
//! lifecycle around one booted handle:
//!
//! ```text
//! Uninitialized --initialize--> Ready --cleanup--> TornDown
//!       ^                         |                   |
//!       |                    execute_code*            |
//!       +-------------- initialize (again) -----------+
//! ```
//!
//! Every operation other than `initialize` and `cleanup` requires `Ready`.
//! A session serializes its own operations: both `execute_code` calls would
//! mount the same entry file, so a second caller waits for the first to finish.

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use super::{CodeExecutor, ExecutionResult};
use crate::errors::ExecutorError;

/// Relative file path inside the sandbox mapped to its contents.
pub type FileTree = BTreeMap<String, String>;

/// Combined output and exit status of a sandboxed process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    pub output: String,
    pub exit_code: i32,
}

/// Boots sandbox instances.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    async fn boot(&self) -> Result<Box<dyn SandboxHandle>, ExecutorError>;
}

/// One booted sandbox instance, exclusively owned by a session.
#[async_trait]
pub trait SandboxHandle: Send + Sync {
    /// Write files into the sandbox filesystem, replacing existing ones.
    async fn mount(&self, files: &FileTree) -> Result<(), ExecutorError>;

    /// Run a process to completion inside the sandbox.
    async fn spawn(&self, command: &str, args: &[String]) -> Result<ProcessOutput, ExecutorError>;

    async fn teardown(self: Box<Self>) -> Result<(), ExecutorError>;
}

/// How a language is laid out and launched inside the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalLanguage {
    pub file_name: &'static str,
    /// Packages that must be installed before the entry file can run.
    pub toolchain: &'static [(&'static str, &'static str)],
    pub command: &'static str,
    pub args: &'static [&'static str],
}

const JAVASCRIPT: LocalLanguage = LocalLanguage {
    file_name: "index.js",
    toolchain: &[],
    command: "node",
    args: &["index.js"],
};

const TYPESCRIPT: LocalLanguage = LocalLanguage {
    file_name: "index.ts",
    toolchain: &[("typescript", "^5.0.0"), ("tsx", "^4.7.0")],
    command: "npx",
    args: &["tsx", "index.ts"],
};

pub fn local_language(language: &str) -> Option<LocalLanguage> {
    match language.to_lowercase().as_str() {
        "javascript" | "node" => Some(JAVASCRIPT),
        "typescript" => Some(TYPESCRIPT),
        _ => None,
    }
}

const PROJECT_NAME: &str = "pocket-project";

enum SessionState {
    Uninitialized,
    Ready(Box<dyn SandboxHandle>),
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Ready,
    TornDown,
}

pub struct LocalSandboxExecutor {
    provider: Arc<dyn SandboxProvider>,
    state: Mutex<SessionState>,
}

impl LocalSandboxExecutor {
    pub fn new(provider: Arc<dyn SandboxProvider>) -> Self {
        Self {
            provider,
            state: Mutex::new(SessionState::Uninitialized),
        }
    }

    pub async fn status(&self) -> SessionStatus {
        match &*self.state.lock().await {
            SessionState::Uninitialized => SessionStatus::Uninitialized,
            SessionState::Ready(_) => SessionStatus::Ready,
            SessionState::TornDown => SessionStatus::TornDown,
        }
    }

    /// Boot the sandbox. Does nothing if the session is already ready; on
    /// failure the session stays unbooted and the call may be retried.
    pub async fn initialize(&self) -> Result<(), ExecutorError> {
        let mut state = self.state.lock().await;
        if matches!(*state, SessionState::Ready(_)) {
            return Ok(());
        }

        match self.provider.boot().await {
            Ok(handle) => {
                *state = SessionState::Ready(handle);
                log::info!("Sandbox initialized successfully");
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to initialize sandbox: {}", e);
                Err(match e {
                    ExecutorError::BackendInitialization(_) => e,
                    other => ExecutorError::BackendInitialization(other.to_string()),
                })
            }
        }
    }

    pub async fn install_dependencies(
        &self,
        dependencies: &BTreeMap<String, String>,
    ) -> Result<(), ExecutorError> {
        let state = self.state.lock().await;
        let SessionState::Ready(handle) = &*state else {
            return Err(ExecutorError::NotInitialized);
        };
        install_into(handle.as_ref(), dependencies).await
    }

    /// Tear the sandbox down. Safe to call any number of times; the session
    /// can be initialized again afterwards.
    pub async fn cleanup(&self) -> Result<(), ExecutorError> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, SessionState::TornDown) {
            SessionState::Ready(handle) => {
                handle.teardown().await?;
                log::info!("Sandbox torn down");
                Ok(())
            }
            SessionState::Uninitialized => {
                *state = SessionState::Uninitialized;
                Ok(())
            }
            SessionState::TornDown => Ok(()),
        }
    }
}

async fn install_into(
    handle: &dyn SandboxHandle,
    dependencies: &BTreeMap<String, String>,
) -> Result<(), ExecutorError> {
    let manifest = json!({
        "name": PROJECT_NAME,
        "version": "1.0.0",
        "dependencies": dependencies,
    });
    let mut files = FileTree::new();
    files.insert("package.json".to_string(), serde_json::to_string_pretty(&manifest)?);
    handle.mount(&files).await?;

    log::debug!("Installing {} sandbox dependencies", dependencies.len());
    let install = handle.spawn("npm", &["install".to_string()]).await?;
    if install.exit_code != 0 {
        return Err(ExecutorError::ExecutionFailure(format!(
            "dependency install exited with code {}: {}",
            install.exit_code,
            install.output.trim()
        )));
    }
    log::info!("Dependencies installed successfully");
    Ok(())
}

async fn run_in(
    handle: &dyn SandboxHandle,
    code: &str,
    language: &str,
) -> Result<ProcessOutput, ExecutorError> {
    let layout = local_language(language)
        .ok_or_else(|| ExecutorError::UnsupportedLanguage(language.to_string()))?;

    let mut files = FileTree::new();
    files.insert(layout.file_name.to_string(), code.to_string());
    handle.mount(&files).await?;

    if !layout.toolchain.is_empty() {
        let toolchain = layout
            .toolchain
            .iter()
            .map(|(name, version)| (name.to_string(), version.to_string()))
            .collect();
        install_into(handle, &toolchain).await?;
    }

    let args: Vec<String> = layout.args.iter().map(|a| a.to_string()).collect();
    handle.spawn(layout.command, &args).await
}

#[async_trait]
impl CodeExecutor for LocalSandboxExecutor {
    async fn execute_code(
        &self,
        code: &str,
        language: &str,
    ) -> Result<ExecutionResult, ExecutorError> {
        let state = self.state.lock().await;
        let SessionState::Ready(handle) = &*state else {
            return Err(ExecutorError::NotInitialized);
        };

        let started = Instant::now();
        match run_in(handle.as_ref(), code, language).await {
            Ok(process) => {
                log::debug!("Sandbox process exited with code {}", process.exit_code);
                Ok(ExecutionResult::from_process(
                    process.output,
                    process.exit_code,
                    started,
                ))
            }
            Err(e) => {
                log::warn!("Sandbox execution failed: {}", e);
                Ok(ExecutionResult::from_error(&e, started))
            }
        }
    }
}
