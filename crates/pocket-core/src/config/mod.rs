//! Configuration for the judge endpoint and the local sandbox.

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;


use crate::errors::ExecutorError;
use std::path::Path;

/// Load configuration from a YAML file with environment overrides applied.
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<PocketConfig, ExecutorError> {
    ConfigLoader::load(Some(path.as_ref())).await
}
