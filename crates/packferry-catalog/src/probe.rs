//! Host reachability probing

use std::collections::HashMap;

use futures::future::join_all;
use packferry_core::{Availability, Host, RunLog, SshConfig};
use packferry_exec::{Executor, SshExecutor};
use tracing::{debug, warn};

/// Probe every known peer concurrently and record the verdicts
///
/// A probe opens one SSH session with the agent's credentials for the peer
/// and closes it again. Success marks the peer `Reachable`, any error is
/// absorbed into `Unreachable`; peers the agent holds no credentials for
/// keep `NoData`. The load must survive an absent agent host, so that case
/// just skips probing entirely.
pub async fn probe_reachability(hosts: &mut HashMap<String, Host>, agent_id: &str) {
    let targets = probe_targets(hosts, agent_id);

    let probes = targets.into_iter().map(|(peer, config)| async move {
        let verdict = probe_one(&config).await;
        (peer, verdict)
    });

    for (peer, verdict) in join_all(probes).await {
        debug!(host = %peer, %verdict, "probe verdict");
        if let Some(host) = hosts.get_mut(&peer) {
            host.available = verdict;
        }
    }
}

/// Peers worth probing: covered by the agent's ssh map and present in the
/// host set
fn probe_targets(hosts: &HashMap<String, Host>, agent_id: &str) -> Vec<(String, SshConfig)> {
    let Some(agent) = hosts.get(agent_id) else {
        warn!(agent = %agent_id, "agent host missing from catalog, skipping probes");
        return Vec::new();
    };

    agent
        .ssh
        .iter()
        .filter(|(peer, _)| hosts.contains_key(*peer))
        .map(|(peer, config)| (peer.clone(), config.clone()))
        .collect()
}

async fn probe_one(config: &SshConfig) -> Availability {
    let exec = SshExecutor::new(config.clone(), RunLog::new());

    let verdict = match exec.ready().await {
        Ok(()) => Availability::Reachable,
        Err(e) => {
            debug!(host = %config.host, error = %e, "probe failed");
            Availability::Unreachable
        }
    };

    // A successful probe leaves a session open; it must always be closed.
    if let Err(e) = exec.finish().await {
        warn!(host = %config.host, error = %e, "failed to close probe session");
    }

    verdict
}
