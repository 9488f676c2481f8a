//! Sandbox capability backed by a private temporary directory and host processes.
//!
//! Each boot creates a fresh directory that acts as the sandbox filesystem.
//! Mounted files are confined to it and every process runs with it as the
//! working directory. Teardown removes the directory.

use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::{Builder, TempDir};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::process::Command;

use super::sandbox::{FileTree, ProcessOutput, SandboxHandle, SandboxProvider};
use crate::config::SandboxConfig;
use crate::errors::ExecutorError;

#[derive(Debug, Clone, Default)]
pub struct NativeSandbox {
    work_dir: Option<PathBuf>,
    process_timeout: Option<Duration>,
}

impl NativeSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        Self {
            work_dir: config.work_dir.clone(),
            process_timeout: config.process_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn with_work_dir(mut self, work_dir: PathBuf) -> Self {
        self.work_dir = Some(work_dir);
        self
    }

    pub fn with_process_timeout(mut self, timeout: Duration) -> Self {
        self.process_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl SandboxProvider for NativeSandbox {
    async fn boot(&self) -> Result<Box<dyn SandboxHandle>, ExecutorError> {
        let mut builder = Builder::new();
        builder.prefix("pocket-sandbox-");
        let dir = match &self.work_dir {
            Some(parent) => {
                tokio::fs::create_dir_all(parent).await?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| {
            ExecutorError::BackendInitialization(format!(
                "Could not create sandbox directory: {}",
                e
            ))
        })?;

        log::debug!("Booted sandbox at {}", dir.path().display());
        Ok(Box::new(NativeSandboxHandle {
            dir,
            process_timeout: self.process_timeout,
        }))
    }
}

pub struct NativeSandboxHandle {
    dir: TempDir,
    process_timeout: Option<Duration>,
}

/// Rejects anything that could land outside the sandbox directory.
fn confine(path: &str) -> Result<PathBuf, ExecutorError> {
    let candidate = Path::new(path);
    let mut confined = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => confined.push(part),
            Component::CurDir => {}
            _ => return Err(ExecutorError::InvalidPath(path.to_string())),
        }
    }
    if confined.as_os_str().is_empty() {
        return Err(ExecutorError::InvalidPath(path.to_string()));
    }
    Ok(confined)
}

#[async_trait]
impl SandboxHandle for NativeSandboxHandle {
    async fn mount(&self, files: &FileTree) -> Result<(), ExecutorError> {
        for (path, contents) in files {
            let target = self.dir.path().join(confine(path)?);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, contents.as_bytes()).await?;
        }
        Ok(())
    }

    async fn spawn(&self, command: &str, args: &[String]) -> Result<ProcessOutput, ExecutorError> {
        let program = which::which(command).map_err(|e| {
            ExecutorError::ExecutionFailure(format!("{} is not available: {}", command, e))
        })?;

        // stdout and stderr share one file description, so writes land in the
        // order the process made them.
        let capture = tempfile::tempfile()?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(self.dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::from(capture.try_clone()?))
            .stderr(Stdio::from(capture.try_clone()?))
            .kill_on_drop(true);

        log::debug!("Spawning `{} {}` in sandbox", command, args.join(" "));
        let mut child = cmd.spawn()?;
        drop(cmd);
        let status = match self.process_timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    if let Err(e) = child.start_kill() {
                        log::warn!("Failed to kill timed out `{}`: {}", command, e);
                    }
                    return Err(ExecutorError::ExecutionFailure(format!(
                        "{} timed out after {}ms",
                        command,
                        limit.as_millis()
                    )));
                }
            },
            None => child.wait().await?,
        };

        let mut capture = tokio::fs::File::from_std(capture);
        capture.seek(SeekFrom::Start(0)).await?;
        let mut bytes = Vec::new();
        capture.read_to_end(&mut bytes).await?;
        let output = String::from_utf8_lossy(&bytes).into_owned();

        Ok(ProcessOutput {
            output,
            exit_code: status.code().unwrap_or(-1),
        })
    }

    async fn teardown(self: Box<Self>) -> Result<(), ExecutorError> {
        let NativeSandboxHandle { dir, .. } = *self;
        log::debug!("Removing sandbox at {}", dir.path().display());
        dir.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn boot_in(parent: &Path) -> Box<dyn SandboxHandle> {
        NativeSandbox::new()
            .with_work_dir(parent.to_path_buf())
            .boot()
            .await
            .unwrap()
    }

    #[test]
    fn test_confine_rejects_escapes() {
        assert!(confine("index.js").is_ok());
        assert_eq!(confine("./src/main.js").unwrap(), PathBuf::from("src/main.js"));
        assert!(matches!(confine("../escape.js"), Err(ExecutorError::InvalidPath(_))));
        assert!(matches!(confine("src/../../x"), Err(ExecutorError::InvalidPath(_))));
        assert!(matches!(confine("/etc/passwd"), Err(ExecutorError::InvalidPath(_))));
        assert!(matches!(confine(""), Err(ExecutorError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_mount_writes_and_overwrites_files() {
        let parent = tempdir().unwrap();
        let handle = boot_in(parent.path()).await;

        let mut files = FileTree::new();
        files.insert("index.js".into(), "first".into());
        files.insert("lib/util.js".into(), "module.exports = 1".into());
        handle.mount(&files).await.unwrap();

        files.insert("index.js".into(), "second".into());
        handle.mount(&files).await.unwrap();

        let sandbox_dir = std::fs::read_dir(parent.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        assert_eq!(std::fs::read_to_string(sandbox_dir.join("index.js")).unwrap(), "second");
        assert!(sandbox_dir.join("lib/util.js").exists());
    }

    #[tokio::test]
    async fn test_teardown_removes_directory() {
        let parent = tempdir().unwrap();
        let handle = boot_in(parent.path()).await;
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 1);

        handle.teardown().await.unwrap();
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let parent = tempdir().unwrap();
        let handle = boot_in(parent.path()).await;
        let err = handle
            .spawn("definitely-not-a-real-binary-pocket", &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("is not available"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_collects_output_and_exit_code() {
        let parent = tempdir().unwrap();
        let handle = boot_in(parent.path()).await;

        let mut files = FileTree::new();
        files.insert("script.sh".into(), "echo out; echo err 1>&2; exit 3".into());
        handle.mount(&files).await.unwrap();

        let out = handle.spawn("sh", &["script.sh".to_string()]).await.unwrap();
        assert_eq!(out.exit_code, 3);
        assert!(out.output.contains("out\n"));
        assert!(out.output.contains("err\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interleaved_output_keeps_write_order() {
        let parent = tempdir().unwrap();
        let handle = boot_in(parent.path()).await;

        let out = handle
            .spawn(
                "sh",
                &["-c".to_string(), "echo a; echo b 1>&2; echo c".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(out.output, "a\nb\nc\n");
        assert_eq!(out.exit_code, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_timeout() {
        let parent = tempdir().unwrap();
        let handle = NativeSandbox::new()
            .with_work_dir(parent.path().to_path_buf())
            .with_process_timeout(Duration::from_millis(100))
            .boot()
            .await
            .unwrap();

        let err = handle
            .spawn("sh", &["-c".to_string(), "sleep 5".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
