//! Dual-mode code execution dispatcher.
//!
//! A snippet and a language go in, one [`ExecutionResult`] comes out. Languages
//! with a local toolchain (JavaScript, TypeScript) run in a sandbox session
//! owned by this process; everything else is submitted to a remote
//! Judge0-compatible service and polled to completion.
//!
//! - **Routing**: [`executors::router`] maps a language to a backend kind
//! - **Local sandbox**: [`executors::sandbox`] drives a pluggable sandbox capability
//! - **Remote judge**: [`executors::judge`] submits and polls with a bounded ceiling
//! - **Construction**: [`executors::factory`] builds backends from configuration
//! - **Orchestration**: [`dispatcher::Dispatcher`] runs the whole flow per call

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod executors;

pub use config::{ConfigLoader, PocketConfig};
pub use dispatcher::Dispatcher;
pub use errors::ExecutorError;
pub use executors::{
    resolve_environment, Backend, CodeExecutor, ExecutionResult, RuntimeEnvironment,
    RuntimeFactory, RuntimeKind,
};
