//! The executor capability trait

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use packferry_core::{BackupPlan, RunLog, SshConfig, Strategy};

use crate::backup::{
    archive_path, dump_dir_path, hook_cmd, mongodump_cmd, mongodump_failure, tar_dir_cmd,
    tar_paths_cmd,
};
use crate::error::ExecError;
use crate::result::CommandResult;

/// A session-scoped executor bound to one host
///
/// Implementations provide the connection lifecycle, raw command execution
/// and byte transfer; everything command-shaped (archive build, scp fan-out,
/// file ops) is layered on top of `run` and shared across implementations.
///
/// `ready` and `finish` are safe to call twice; every other method requires
/// an open session.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Open the session
    async fn ready(&self) -> Result<(), ExecError>;

    /// Close the session
    async fn finish(&self) -> Result<(), ExecError>;

    /// Run a shell command on the session host and wait for it to exit
    async fn run(&self, cmd: &str) -> Result<CommandResult, ExecError>;

    /// Copy a file from the session host to the agent's filesystem
    async fn download(&self, remote: &str, local: &Path) -> Result<(), ExecError>;

    /// Copy a file from the agent's filesystem to the session host
    async fn upload(&self, local: &Path, remote: &str) -> Result<(), ExecError>;

    /// The per-plan log sink this executor reports into
    fn log(&self) -> &RunLog;

    /// Run a command and require exit status 0
    async fn run_checked(&self, cmd: &str) -> Result<CommandResult, ExecError> {
        let result = self.run(cmd).await?;
        if !result.success() {
            return Err(ExecError::CommandFailed {
                status: result.status,
                stderr: result.stderr,
            });
        }
        Ok(result)
    }

    /// Produce the backup artifact on the session host
    ///
    /// Runs the pre hook, builds the archive per the plan's strategy, runs
    /// the post hook, and returns the absolute archive path. Hook failures
    /// propagate.
    async fn execute(&self, plan: &BackupPlan) -> Result<String, ExecError> {
        let archive = archive_path();

        if let Some(hook) = plan.hooks.as_ref().and_then(|h| h.pre.as_ref()) {
            self.log().push(format!("running pre hook: {}", hook.cmd));
            self.run_checked(&hook_cmd(hook)).await?;
        }

        match &plan.strategy {
            Strategy::Files { paths } => {
                self.log()
                    .push(format!("archiving {} path(s) into {archive}", paths.len()));
                self.run_checked(&tar_paths_cmd(&archive, paths)).await?;
            }
            Strategy::Mongodb { connection_url } => {
                let dump_dir = dump_dir_path();
                self.log().push(format!("dumping mongodb into {dump_dir}"));
                let result = self.run(&mongodump_cmd(&dump_dir, connection_url)).await?;
                if let Some(output) = mongodump_failure(&result) {
                    return Err(ExecError::CommandFailed {
                        status: result.status,
                        stderr: output,
                    });
                }
                if !result.success() {
                    self.log().push(format!(
                        "mongodump exited {}, output treated as informational",
                        result.status
                    ));
                }
                self.run_checked(&tar_dir_cmd(&archive, &dump_dir)).await?;
                self.run_checked(&format!("rm -r {dump_dir}")).await?;
            }
        }

        if let Some(hook) = plan.hooks.as_ref().and_then(|h| h.post.as_ref()) {
            self.log().push(format!("running post hook: {}", hook.cmd));
            self.run_checked(&hook_cmd(hook)).await?;
        }

        self.log().push(format!("archive ready at {archive}"));
        Ok(archive)
    }

    /// Have the session host pull `remote` from `peer` via scp
    async fn scp_download(
        &self,
        remote: &str,
        peer: &SshConfig,
        local_on_session: &str,
    ) -> Result<(), ExecError> {
        self.log().push(format!(
            "scp {}@{}:{remote} -> {local_on_session}",
            peer.username, peer.host
        ));
        self.run_checked(&format!(
            "scp -i {} {}@{}:{} {}",
            peer.private_key_path, peer.username, peer.host, remote, local_on_session
        ))
        .await?;
        Ok(())
    }

    /// Have the session host push `local_on_session` to `peer` via scp
    async fn scp_upload(
        &self,
        local_on_session: &str,
        peer: &SshConfig,
        remote_on_peer: &str,
    ) -> Result<(), ExecError> {
        self.log().push(format!(
            "scp {local_on_session} -> {}@{}:{remote_on_peer}",
            peer.username, peer.host
        ));
        self.run_checked(&format!(
            "scp -i {} {} {}@{}:{}",
            peer.private_key_path, local_on_session, peer.username, peer.host, remote_on_peer
        ))
        .await?;
        Ok(())
    }

    /// Move a file on the session host
    async fn move_file(&self, src: &str, dest: &str) -> Result<(), ExecError> {
        self.log().push(format!("mv {src} -> {dest}"));
        self.run_checked(&format!("mv {src} {dest}")).await?;
        Ok(())
    }

    /// Delete a file on the session host
    async fn delete_file(&self, path: &str) -> Result<(), ExecError> {
        self.log().push(format!("rm {path}"));
        self.run_checked(&format!("rm {path}")).await?;
        Ok(())
    }
}

/// Creates executors for the coordinator
///
/// The production implementation builds SSH executors from catalog
/// credentials; tests inject scripted executors through the same seam.
pub trait ExecutorFactory: Send + Sync {
    fn create(&self, config: &SshConfig, log: RunLog) -> Arc<dyn Executor>;
}
