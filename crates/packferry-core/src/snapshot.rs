//! Read-only catalog snapshot

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::blueprint::Blueprint;
use crate::model::host::Host;

/// Everything one invocation plans against, loaded once by the coordinator
/// and treated as immutable from then on
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub hosts: HashMap<String, Host>,
    pub blueprints: Vec<Blueprint>,
    /// Most recent successful run per blueprint id
    pub last_runs: HashMap<String, DateTime<Utc>>,
    pub agent_id: String,
}

impl Snapshot {
    /// The host this agent runs on, if present in the catalog
    #[must_use]
    pub fn agent(&self) -> Option<&Host> {
        self.hosts.get(&self.agent_id)
    }

    #[must_use]
    pub fn last_run(&self, blueprint_id: &str) -> Option<DateTime<Utc>> {
        self.last_runs.get(blueprint_id).copied()
    }
}
