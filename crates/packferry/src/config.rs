//! Invocation environment

use color_eyre::eyre::{Result, eyre};

/// Configuration passed via the environment
///
/// A missing required variable is fatal; there is no config file.
#[derive(Debug, Clone)]
pub struct Config {
    /// Catalog connection URL (`MONGODB`)
    pub mongodb_url: String,
    /// Catalog database name (`DATABASE`)
    pub database: String,
    /// Id of the host this agent runs on (`AGENT`)
    pub agent_id: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            mongodb_url: require("MONGODB")?,
            database: std::env::var("DATABASE").unwrap_or_else(|_| "backups".to_string()),
            agent_id: require("AGENT")?,
        })
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| eyre!("required environment variable {name} is not set"))
}
