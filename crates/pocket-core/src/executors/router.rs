//! Language routing between the local sandbox and the remote judge.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages that run inside the local sandbox. Everything else, including
/// identifiers nobody has heard of, goes to the remote judge.
pub const LOCAL_SANDBOX_LANGUAGES: &[&str] = &["javascript", "typescript", "node"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuntimeKind {
    LocalSandbox,
    RemoteJudge,
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeKind::LocalSandbox => write!(f, "local-sandbox"),
            RuntimeKind::RemoteJudge => write!(f, "remote-judge"),
        }
    }
}

/// Routing decision for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeEnvironment {
    pub kind: RuntimeKind,
    /// Lower-cased language identifier.
    pub language: String,
    /// Reserved for pinning a backend version; routing ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl RuntimeEnvironment {
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

pub fn resolve_environment(language: &str) -> RuntimeEnvironment {
    let language = language.to_lowercase();
    let kind = if LOCAL_SANDBOX_LANGUAGES.contains(&language.as_str()) {
        RuntimeKind::LocalSandbox
    } else {
        RuntimeKind::RemoteJudge
    };
    RuntimeEnvironment {
        kind,
        language,
        version: None,
    }
}
