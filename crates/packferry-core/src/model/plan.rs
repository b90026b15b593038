//! Plans: the planner's verdict per blueprint

use serde::{Deserialize, Serialize};

use crate::model::blueprint::{Destination, Hooks, Strategy};
use crate::model::host::Host;

/// Local staging decision for the artifact
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadLocally {
    /// The artifact never touches the agent
    #[default]
    No,
    /// Downloaded only to stage redirected transfers, removed afterwards
    Transient,
    /// Downloaded and kept at the given directory or prefix
    Keep { path: String },
}

impl DownloadLocally {
    /// Whether the artifact must be downloaded to the agent at all
    #[must_use]
    pub fn is_requested(&self) -> bool {
        !matches!(self, Self::No)
    }
}

/// The transport plan: exactly which transfers realise the blueprint's
/// destinations
///
/// Every destination appears in at most one bucket, and never names the
/// source host or the agent (those become `retain_on_host` and
/// `download_locally` instead).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CloneStrategy {
    /// Move the artifact into this path on the source host instead of
    /// deleting it there
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retain_on_host: Option<String>,
    #[serde(default)]
    pub download_locally: DownloadLocally,
    /// Destinations the source host pushes to itself
    #[serde(default)]
    pub directly_clone_to: Vec<Destination>,
    /// Destinations neither side can reach directly; the agent couriers
    #[serde(default)]
    pub redirect_clone_to: Vec<Destination>,
    /// Destinations that pull the artifact off the source host themselves
    #[serde(default)]
    pub receive_clone_from: Vec<Destination>,
}

impl CloneStrategy {
    /// True when the plan would ship the artifact nowhere
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.retain_on_host.is_none()
            && !self.download_locally.is_requested()
            && self.directly_clone_to.is_empty()
            && self.redirect_clone_to.is_empty()
            && self.receive_clone_from.is_empty()
    }
}

/// An executable backup, the only plan variant the executor accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPlan {
    pub id: String,
    /// Resolved source host
    pub host: Host,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<Hooks>,
    pub strategy: Strategy,
    pub clone: CloneStrategy,
    /// Advisory: some destinations were dropped as unknown or unreachable
    #[serde(default)]
    pub some_destinations_skipped: bool,
}

/// What the planner decided for one blueprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum Plan {
    SshAgent(BackupPlan),
    Skipped { id: String, reason: String },
    Failed { id: String, reason: String },
}

impl Plan {
    /// Blueprint id this plan was derived from
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::SshAgent(plan) => &plan.id,
            Self::Skipped { id, .. } | Self::Failed { id, .. } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_clone_strategy_ships_nowhere() {
        let mut clone = CloneStrategy::default();
        assert!(clone.is_empty());

        clone.retain_on_host = Some("/keep/".to_string());
        assert!(!clone.is_empty());

        let clone = CloneStrategy {
            download_locally: DownloadLocally::Transient,
            ..CloneStrategy::default()
        };
        assert!(!clone.is_empty());
    }

    #[test]
    fn plan_serializes_with_mode_tag() {
        let plan = Plan::Skipped {
            id: "etc-backup".to_string(),
            reason: "not due".to_string(),
        };

        assert_eq!(plan.id(), "etc-backup");

        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["mode"], "skipped");
        assert_eq!(value["id"], "etc-backup");

        let back: Plan = serde_json::from_value(value).unwrap();
        assert_eq!(back, plan);
    }
}
