//! packferry agent
//!
//! Loads the catalog, plans every blueprint, and executes the accepted
//! plans serially over SSH. Invoked externally (e.g. by a periodic timer);
//! exits 0 on any completed invocation, non-zero only on fatals.

use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use packferry_catalog::Catalog;
use packferry_core::Snapshot;
use packferry_exec::SshExecutorFactory;

mod cli;
mod config;
mod coordinator;
mod prompt;

use coordinator::Coordinator;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();
    let config = config::Config::from_env()?;

    let catalog = Catalog::connect(&config.mongodb_url, &config.database, &config.agent_id).await?;

    let hosts = catalog.load_hosts().await?;
    let blueprints = catalog.load_blueprints().await?;
    let last_runs = catalog.load_last_runs(&blueprints).await?;
    let snapshot = Snapshot {
        hosts,
        blueprints,
        last_runs,
        agent_id: config.agent_id.clone(),
    };

    let coordinator = Coordinator::new(snapshot, Arc::new(SshExecutorFactory));
    let plans = coordinator.plan_all();

    if plans.is_empty() {
        info!("no plans to execute");
        return Ok(());
    }

    if cli.dry_run {
        for plan in &plans {
            info!(plan = %plan.id, host = %plan.host.id, "would execute");
        }
        return Ok(());
    }

    if !cli.yes && !prompt::confirm_execution(plans.len())? {
        info!("aborted by operator");
        return Ok(());
    }

    let summary = coordinator.execute_all(&plans, &catalog).await?;
    info!(
        executed = summary.executed,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "invocation complete"
    );

    Ok(())
}
