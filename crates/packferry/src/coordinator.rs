//! The run coordinator
//!
//! Plans every blueprint against the snapshot, then executes the accepted
//! plans one at a time. Each executed plan gets its own log sink and exactly
//! one run record; an execution failure aborts that plan only.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use packferry_catalog::{Catalog, CatalogError};
use packferry_core::{
    BackupPlan, Destination, DownloadLocally, Plan, RunLog, Snapshot, SshConfig,
    backup_file_name, planner,
};
use packferry_exec::{ExecError, Executor, ExecutorFactory};

/// Outcome counters for one invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Drives the plan → confirm → execute → record pipeline
pub struct Coordinator {
    snapshot: Snapshot,
    factory: Arc<dyn ExecutorFactory>,
    backups_dir: PathBuf,
}

impl Coordinator {
    #[must_use]
    pub fn new(snapshot: Snapshot, factory: Arc<dyn ExecutorFactory>) -> Self {
        Self {
            snapshot,
            factory,
            backups_dir: PathBuf::from("./backups"),
        }
    }

    /// Where locally staged and retained artifacts land
    #[must_use]
    pub fn with_backups_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backups_dir = dir.into();
        self
    }

    /// Plan every blueprint and keep the executable ones
    ///
    /// Skipped and failed plans are logged and dropped here; they are never
    /// executed and never recorded, so a failing blueprint stays due.
    #[must_use]
    pub fn plan_all(&self) -> Vec<BackupPlan> {
        let now = Utc::now();
        let mut plans = Vec::new();

        for blueprint in &self.snapshot.blueprints {
            match planner::plan(&self.snapshot, blueprint, now) {
                Plan::SshAgent(plan) => plans.push(plan),
                Plan::Skipped { id, reason } => {
                    info!(blueprint = %id, %reason, "blueprint skipped");
                }
                // The planner already logged the cause.
                Plan::Failed { .. } => {}
            }
        }

        info!(count = plans.len(), "planning complete");
        plans
    }

    /// Execute the accepted plans serially, appending one record each
    pub async fn execute_all(
        &self,
        plans: &[BackupPlan],
        catalog: &Catalog,
    ) -> Result<RunSummary, CatalogError> {
        let mut summary = RunSummary {
            executed: plans.len(),
            ..RunSummary::default()
        };

        for plan in plans {
            let log = RunLog::new();
            log.push(format!("executing plan {}", plan.id));

            let error = match self.execute_plan(plan, &log).await {
                Ok(()) => {
                    summary.succeeded += 1;
                    log.push(format!("plan {} complete", plan.id));
                    None
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(plan = %plan.id, error = %e, "plan execution failed");
                    log.push(format!("plan {} failed: {e}", plan.id));
                    Some(e.to_string())
                }
            };

            catalog.save_run(plan, log.take(), error).await?;
        }

        Ok(summary)
    }

    /// Execute one plan against a fresh session on the source host
    ///
    /// The session is released on every exit path.
    pub async fn execute_plan(&self, plan: &BackupPlan, log: &RunLog) -> Result<(), ExecError> {
        let agent_cred = self.agent_credentials(&plan.host.id)?;

        let session = self.factory.create(agent_cred, log.clone());
        session.ready().await?;

        let result = self.run_transfers(session.as_ref(), plan).await;

        if let Err(e) = session.finish().await {
            warn!(plan = %plan.id, error = %e, "failed to close session");
        }

        result
    }

    /// Build the artifact and fan it out per the clone strategy
    async fn run_transfers(
        &self,
        session: &dyn Executor,
        plan: &BackupPlan,
    ) -> Result<(), ExecError> {
        let archive = session.execute(plan).await?;
        let name = backup_file_name(&plan.id, Utc::now());

        let result = self.fan_out(session, plan, &archive, &name).await;

        // The archive on the source host never outlives the plan: moved into
        // the retention path on success, deleted otherwise.
        let cleanup = match (&result, &plan.clone.retain_on_host) {
            (Ok(()), Some(path)) => session.move_file(&archive, &format!("{path}{name}")).await,
            _ => session.delete_file(&archive).await,
        };

        result.and(cleanup)
    }

    async fn fan_out(
        &self,
        session: &dyn Executor,
        plan: &BackupPlan,
        archive: &str,
        name: &str,
    ) -> Result<(), ExecError> {
        let source = &plan.host;

        // Source-side pushes complete first.
        for dest in &plan.clone.directly_clone_to {
            let Destination::Host { host, path } = dest;
            let cred = source.ssh.get(host).ok_or_else(|| {
                ExecError::ConfigError(format!(
                    "source '{}' holds no ssh credentials for '{host}'",
                    source.id
                ))
            })?;
            session
                .scp_upload(archive, cred, &format!("{path}{name}"))
                .await?;
        }

        // Destinations that pull the artifact off the source themselves. The
        // agent logs into the destination, which uses its own key for the
        // source.
        for dest in &plan.clone.receive_clone_from {
            let Destination::Host { host, path } = dest;
            let pull_cred = self
                .snapshot
                .hosts
                .get(host)
                .and_then(|h| h.ssh.get(&source.id))
                .ok_or_else(|| {
                    ExecError::ConfigError(format!(
                        "destination '{host}' holds no ssh credentials for '{}'",
                        source.id
                    ))
                })?;

            let peer = self.factory.create(self.agent_credentials(host)?, session.log().clone());
            peer.ready().await?;
            let transfer = peer
                .scp_download(archive, pull_cred, &format!("{path}{name}"))
                .await;
            if let Err(e) = peer.finish().await {
                warn!(destination = %host, error = %e, "failed to close peer session");
            }
            transfer?;
        }

        // Local staging last, feeding any agent-couriered redirects.
        if plan.clone.download_locally.is_requested() {
            let local = self.stage_locally(session, archive, name).await?;

            let redirects = self.redirect(plan, &local, name, session.log()).await;

            if !matches!(plan.clone.download_locally, DownloadLocally::Keep { .. }) {
                if let Err(e) = tokio::fs::remove_file(&local).await {
                    warn!(path = %local.display(), error = %e, "failed to remove staged artifact");
                }
            }
            redirects?;
        }

        Ok(())
    }

    /// Download the artifact into the agent's backups directory
    async fn stage_locally(
        &self,
        session: &dyn Executor,
        archive: &str,
        name: &str,
    ) -> Result<PathBuf, ExecError> {
        tokio::fs::create_dir_all(&self.backups_dir)
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;
        let local = std::path::absolute(self.backups_dir.join(name))
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        session.download(archive, &local).await?;
        Ok(local)
    }

    /// Push the staged artifact to every redirected destination
    async fn redirect(
        &self,
        plan: &BackupPlan,
        local: &Path,
        name: &str,
        log: &RunLog,
    ) -> Result<(), ExecError> {
        for dest in &plan.clone.redirect_clone_to {
            let Destination::Host { host, path } = dest;

            let peer = self.factory.create(self.agent_credentials(host)?, log.clone());
            peer.ready().await?;
            let transfer = peer.upload(local, &format!("{path}{name}")).await;
            if let Err(e) = peer.finish().await {
                warn!(destination = %host, error = %e, "failed to close peer session");
            }
            transfer?;
        }
        Ok(())
    }

    fn agent_credentials(&self, peer: &str) -> Result<&SshConfig, ExecError> {
        self.snapshot
            .agent()
            .and_then(|agent| agent.ssh.get(peer))
            .ok_or_else(|| {
                ExecError::ConfigError(format!("agent holds no ssh credentials for '{peer}'"))
            })
    }
}
