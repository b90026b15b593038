//! Per-blueprint planning
//!
//! Decides whether a blueprint is due, whether it can be produced, and how
//! the artifact reaches each destination. Pure apart from log emission: the
//! same snapshot, blueprint and `now` always yield a structurally equal
//! plan. Planning failures never propagate as errors; they come back as
//! `Plan::Failed` and the coordinator moves on.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::model::blueprint::{Blueprint, BlueprintKind, Destination, Hooks, Strategy};
use crate::model::host::{Availability, Host};
use crate::model::plan::{BackupPlan, CloneStrategy, DownloadLocally, Plan};
use crate::snapshot::Snapshot;

/// Decide what to do for one blueprint against the loaded snapshot
pub fn plan(snapshot: &Snapshot, blueprint: &Blueprint, now: DateTime<Utc>) -> Plan {
    if let Some(last) = snapshot.last_run(&blueprint.id) {
        let next_due = blueprint.interval.next_due(last);
        if next_due > now {
            debug!(blueprint = %blueprint.id, %next_due, "not due yet");
            return Plan::Skipped {
                id: blueprint.id.clone(),
                reason: format!("not due until {next_due}"),
            };
        }
    }

    match &blueprint.kind {
        BlueprintKind::Dummy => Plan::Skipped {
            id: blueprint.id.clone(),
            reason: "dummy blueprint".to_string(),
        },
        BlueprintKind::SshAgent {
            host,
            hooks,
            strategy,
            destinations,
        } => plan_backup(snapshot, &blueprint.id, host, hooks, strategy, destinations),
    }
}

fn plan_backup(
    snapshot: &Snapshot,
    id: &str,
    source_id: &str,
    hooks: &Option<Hooks>,
    strategy: &Strategy,
    destinations: &[Destination],
) -> Plan {
    let Some(source) = snapshot.hosts.get(source_id) else {
        return failed(id, format!("unknown source host '{source_id}'"));
    };
    if !source.available.is_reachable() {
        return failed(
            id,
            format!("source host '{}' is {}", source.id, source.available),
        );
    }
    let Some(agent) = snapshot.agent() else {
        return failed(
            id,
            format!("agent host '{}' missing from catalog", snapshot.agent_id),
        );
    };
    if !agent.can_reach(&source.id) {
        return failed(
            id,
            format!("agent holds no ssh credentials for '{}'", source.id),
        );
    }

    let (clone, some_skipped) = classify(snapshot, source, destinations);

    if clone.is_empty() {
        return failed(id, "no viable destinations");
    }

    Plan::SshAgent(BackupPlan {
        id: id.to_string(),
        host: source.clone(),
        hooks: hooks.clone(),
        strategy: strategy.clone(),
        clone,
        some_destinations_skipped: some_skipped,
    })
}

/// Sort each destination into the transport bucket the topology allows
///
/// Destinations naming the source host or the agent become the retention
/// options (first occurrence wins) and never land in a bucket. Unknown and
/// unreachable destinations are dropped with the advisory flag set. A
/// destination the source can push to directly is never redirected or
/// pulled.
fn classify(
    snapshot: &Snapshot,
    source: &Host,
    destinations: &[Destination],
) -> (CloneStrategy, bool) {
    let mut clone = CloneStrategy::default();
    let mut some_skipped = false;

    for dest in destinations {
        let Destination::Host {
            host: dest_id,
            path,
        } = dest;

        if *dest_id == source.id {
            if clone.retain_on_host.is_none() {
                clone.retain_on_host = Some(path.clone());
            }
            continue;
        }
        if *dest_id == snapshot.agent_id {
            if !clone.download_locally.is_requested() {
                clone.download_locally = DownloadLocally::Keep { path: path.clone() };
            }
            continue;
        }

        let Some(peer) = snapshot.hosts.get(dest_id) else {
            warn!(destination = %dest_id, "dropping destination: unknown host");
            some_skipped = true;
            continue;
        };
        if peer.available == Availability::Unreachable {
            warn!(destination = %dest_id, "dropping destination: host unreachable");
            some_skipped = true;
            continue;
        }

        if source.can_reach(dest_id) {
            clone.directly_clone_to.push(dest.clone());
        } else if peer.can_reach(&source.id) {
            clone.receive_clone_from.push(dest.clone());
        } else {
            clone.redirect_clone_to.push(dest.clone());
        }
    }

    // Redirected transfers go through the agent's disk, so staging is forced
    // even when no destination asked for a local copy.
    if !clone.redirect_clone_to.is_empty() && !clone.download_locally.is_requested() {
        clone.download_locally = DownloadLocally::Transient;
    }

    (clone, some_skipped)
}

fn failed(id: &str, reason: impl Into<String>) -> Plan {
    let reason = reason.into();
    warn!(blueprint = %id, %reason, "planning failed");
    Plan::Failed {
        id: id.to_string(),
        reason,
    }
}
