//! The catalog store

use std::collections::HashMap;

use bson::{Bson, doc};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Client, Database};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use packferry_core::{BackupPlan, Blueprint, Host, Plan};

use crate::error::CatalogError;
use crate::probe::probe_reachability;

const HOSTS: &str = "hosts";
const BLUEPRINTS: &str = "blueprints";
const RUN_LOG: &str = "run_log";

/// One appended entry in the run log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
    pub plan: Plan,
    pub log: Vec<String>,
    /// Present iff the run failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Projection for last-run lookups
#[derive(Debug, Deserialize)]
struct RunStamp {
    timestamp: bson::DateTime,
}

/// Adapter over the three catalog collections
pub struct Catalog {
    db: Database,
    agent_id: String,
}

impl Catalog {
    /// Connect to the store and verify it answers
    ///
    /// An unreachable store is fatal for the whole invocation, so it
    /// surfaces here rather than on the first query.
    pub async fn connect(uri: &str, database: &str, agent_id: &str) -> Result<Self, CatalogError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| CatalogError::Connection(e.to_string()))?;
        let db = client.database(database);

        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| CatalogError::Connection(e.to_string()))?;

        info!(database = %database, "catalog connected");

        Ok(Self {
            db,
            agent_id: agent_id.to_string(),
        })
    }

    /// Load every host, mark the agent, and probe peer reachability
    ///
    /// Probes run concurrently and are awaited before this returns; an
    /// individual probe failure only marks its host `Unreachable`.
    #[instrument(skip(self))]
    pub async fn load_hosts(&self) -> Result<HashMap<String, Host>, CatalogError> {
        let mut cursor = self.db.collection::<Host>(HOSTS).find(doc! {}).await?;

        let mut hosts = HashMap::new();
        while let Some(mut host) = cursor.try_next().await? {
            host.agent = host.id == self.agent_id;
            hosts.insert(host.id.clone(), host);
        }

        debug!(count = hosts.len(), "hosts loaded, probing reachability");
        probe_reachability(&mut hosts, &self.agent_id).await;

        Ok(hosts)
    }

    #[instrument(skip(self))]
    pub async fn load_blueprints(&self) -> Result<Vec<Blueprint>, CatalogError> {
        let mut cursor = self
            .db
            .collection::<Blueprint>(BLUEPRINTS)
            .find(doc! {})
            .await?;

        let mut blueprints = Vec::new();
        while let Some(blueprint) = cursor.try_next().await? {
            blueprints.push(blueprint);
        }

        debug!(count = blueprints.len(), "blueprints loaded");
        Ok(blueprints)
    }

    /// Most recent run of `plan_id` that recorded no error
    ///
    /// `error: null` matches both an absent and a null error field, so
    /// records written before the field existed still count as successes.
    pub async fn find_last_successful_run(
        &self,
        plan_id: &str,
    ) -> Result<Option<DateTime<Utc>>, CatalogError> {
        let record = self
            .db
            .collection::<RunStamp>(RUN_LOG)
            .find_one(doc! { "plan.id": plan_id, "error": Bson::Null })
            .sort(doc! { "timestamp": -1 })
            .projection(doc! { "timestamp": 1 })
            .await?;

        Ok(record.map(|r| r.timestamp.to_chrono()))
    }

    /// Last successful run per blueprint, for the snapshot
    pub async fn load_last_runs(
        &self,
        blueprints: &[Blueprint],
    ) -> Result<HashMap<String, DateTime<Utc>>, CatalogError> {
        let mut last_runs = HashMap::new();
        for blueprint in blueprints {
            if let Some(ts) = self.find_last_successful_run(&blueprint.id).await? {
                last_runs.insert(blueprint.id.clone(), ts);
            }
        }
        Ok(last_runs)
    }

    /// Append one run record; presence of `error` marks the run as failed
    #[instrument(skip(self, plan, log, error), fields(plan = %plan.id))]
    pub async fn save_run(
        &self,
        plan: &BackupPlan,
        log: Vec<String>,
        error: Option<String>,
    ) -> Result<(), CatalogError> {
        let record = RunRecord {
            timestamp: Utc::now(),
            plan: Plan::SshAgent(plan.clone()),
            log,
            error,
        };

        self.db
            .collection::<RunRecord>(RUN_LOG)
            .insert_one(&record)
            .await?;

        debug!(plan = %plan.id, failed = record.error.is_some(), "run recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use packferry_core::{Availability, CloneStrategy, Strategy};

    use super::*;

    fn plan() -> BackupPlan {
        BackupPlan {
            id: "etc-backup".to_string(),
            host: Host {
                id: "bravo".to_string(),
                agent: false,
                available: Availability::Reachable,
                ssh: HashMap::new(),
            },
            hooks: None,
            strategy: Strategy::Files {
                paths: vec!["/etc".to_string()],
            },
            clone: CloneStrategy {
                retain_on_host: Some("/keep/".to_string()),
                ..CloneStrategy::default()
            },
            some_destinations_skipped: false,
        }
    }

    #[test]
    fn run_record_round_trips_through_bson() {
        let record = RunRecord {
            timestamp: Utc::now(),
            plan: Plan::SshAgent(plan()),
            log: vec!["archive ready".to_string()],
            error: None,
        };

        let doc = bson::to_document(&record).unwrap();
        // A successful run must not carry an error field at all, so the
        // `error: null` success query keeps matching it.
        assert!(!doc.contains_key("error"));
        // The chrono bridge must produce a native BSON datetime, not a string.
        assert!(matches!(doc.get("timestamp"), Some(Bson::DateTime(_))));
        // Last-run lookups filter on these two paths.
        let plan_doc = doc.get_document("plan").unwrap();
        assert_eq!(plan_doc.get_str("mode").unwrap(), "ssh-agent");
        assert_eq!(plan_doc.get_str("id").unwrap(), "etc-backup");

        let back: RunRecord = bson::from_document(doc).unwrap();
        assert_eq!(back.plan, record.plan);
        assert_eq!(back.log, record.log);
        assert!(back.error.is_none());
    }

    #[test]
    fn failed_run_record_keeps_its_error() {
        let record = RunRecord {
            timestamp: Utc::now(),
            plan: Plan::SshAgent(plan()),
            log: Vec::new(),
            error: Some("connection failed".to_string()),
        };

        let doc = bson::to_document(&record).unwrap();
        assert_eq!(doc.get_str("error").unwrap(), "connection failed");
    }

    // Store queries need a live MongoDB; the document shapes above are the
    // contract they rely on.
    #[tokio::test]
    #[ignore = "requires MongoDB"]
    async fn connect_against_live_store() {}
}
