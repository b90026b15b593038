//! Command line surface

use clap::Parser;

/// Multi-host backup agent: plans due blueprints from the catalog and
/// drives them over SSH
#[derive(Debug, Parser)]
#[command(name = "packferry", version)]
pub struct Cli {
    /// Skip the confirmation prompt (for timer-driven invocations)
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Plan only: print what would run, execute nothing, record nothing
    #[arg(long)]
    pub dry_run: bool,
}
