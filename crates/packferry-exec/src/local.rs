//! Local execution using `tokio::process`
//!
//! Placeholder executor variant for blueprints whose source host is the
//! agent itself: commands run through the local shell, transfers are plain
//! filesystem copies.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use packferry_core::RunLog;
use tokio::process::Command;
use tracing::{debug, error, instrument};

use crate::error::ExecError;
use crate::result::CommandResult;
use crate::traits::Executor;

/// Executor for the agent's own machine
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor {
    log: RunLog,
}

impl LocalExecutor {
    #[must_use]
    pub fn new(log: RunLog) -> Self {
        Self { log }
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    async fn ready(&self) -> Result<(), ExecError> {
        Ok(())
    }

    async fn finish(&self) -> Result<(), ExecError> {
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        self.log.push(format!("[local] $ {cmd}"));

        let start = Instant::now();

        // Shell so pipes and redirections in hook commands work.
        let child = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::SpawnError(e.to_string()))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let duration = start.elapsed();
        let status = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        debug!(
            command = %cmd,
            status = status,
            duration = ?duration,
            "command completed"
        );

        if !output.status.success() {
            error!(command = %cmd, status = status, stderr = %stderr, "command failed");
        }

        Ok(CommandResult {
            status,
            stdout,
            stderr,
            duration,
        })
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<(), ExecError> {
        self.log
            .push(format!("copying {remote} -> {}", local.display()));
        tokio::fs::copy(remote, local)
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;
        Ok(())
    }

    async fn upload(&self, local: &Path, remote: &str) -> Result<(), ExecError> {
        self.log
            .push(format!("copying {} -> {remote}", local.display()));
        tokio::fs::copy(local, remote)
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;
        Ok(())
    }

    fn log(&self) -> &RunLog {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> LocalExecutor {
        LocalExecutor::new(RunLog::new())
    }

    #[tokio::test]
    async fn run_success() {
        let result = executor().run("echo hello").await.unwrap();

        assert!(result.success());
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn run_failure() {
        let result = executor().run("exit 42").await.unwrap();

        assert!(!result.success());
        assert_eq!(result.status, 42);
    }

    #[tokio::test]
    async fn run_with_stderr() {
        let result = executor().run("echo oops >&2").await.unwrap();

        assert!(result.success());
        assert_eq!(result.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn move_and_delete_files() {
        let exec = executor();
        let dir = std::env::temp_dir().join(format!("packferry_local_{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let src = dir.join("a.txt");
        let dest = dir.join("b.txt");
        tokio::fs::write(&src, b"payload").await.unwrap();

        exec.move_file(&src.display().to_string(), &dest.display().to_string())
            .await
            .unwrap();
        assert!(!src.exists());
        assert!(dest.exists());

        exec.delete_file(&dest.display().to_string()).await.unwrap();
        assert!(!dest.exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn transfers_are_plain_copies() {
        let exec = executor();
        let dir = std::env::temp_dir().join(format!("packferry_copy_{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let origin = dir.join("origin.txt");
        let staged = dir.join("staged.txt");
        tokio::fs::write(&origin, b"bytes").await.unwrap();

        exec.download(&origin.display().to_string(), &staged)
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&staged).await.unwrap(), b"bytes");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
