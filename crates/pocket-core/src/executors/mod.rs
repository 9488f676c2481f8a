//! Code execution backends behind one contract.
//!
//! Languages with a local toolchain run inside a sandbox session that this
//! process owns; every other language is submitted to a remote judging service
//! and polled until it finishes. Both backends hand back the same
//! [`ExecutionResult`] so callers never branch on which one ran.

use async_trait::async_trait;
use crate::errors::ExecutorError;

pub mod factory;
pub mod judge;
pub mod native_sandbox;
pub mod result;
pub mod router;
pub mod sandbox;

pub use factory::{Backend, RuntimeFactory};
pub use judge::RemoteJudgeExecutor;
pub use native_sandbox::NativeSandbox;
pub use result::ExecutionResult;
pub use router::{resolve_environment, RuntimeEnvironment, RuntimeKind};
pub use sandbox::LocalSandboxExecutor;

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Run `code` as `language`.
    ///
    /// Execution failures of any kind are reported through
    /// `ExecutionResult::error`. `Err` is reserved for a backend that cannot be
    /// used at all, such as a sandbox session that was never initialized.
    async fn execute_code(
        &self,
        code: &str,
        language: &str,
    ) -> Result<ExecutionResult, ExecutorError>;
}
