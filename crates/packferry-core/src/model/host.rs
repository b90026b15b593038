//! Host documents and reachability

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Reachability verdict for a host, set by the catalog probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// A probe session opened successfully
    Reachable,
    /// A probe session failed to open
    Unreachable,
    /// Never probed (the agent holds no credentials for this host)
    #[default]
    NoData,
}

impl Availability {
    /// Whether the host passed a probe
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Reachable => "reachable",
            Self::Unreachable => "unreachable",
            Self::NoData => "no_data",
        };
        write!(f, "{s}")
    }
}

/// Parameters one host uses to open an SSH session into a peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConfig {
    /// SSH user on the peer
    pub username: String,
    /// Address the peer is reached at
    pub host: String,
    /// Private key file, resolved on the side that opens the session
    pub private_key_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
}

/// A machine in the catalog
///
/// The `ssh` map is directional: `ssh[peer]` describes how *this* host
/// reaches `peer`, not the other way around. The planner's transport
/// classification rests on that asymmetry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    #[serde(rename = "_id")]
    pub id: String,
    /// Set on the host whose id matches the configured agent id
    #[serde(default)]
    pub agent: bool,
    #[serde(default)]
    pub available: Availability,
    #[serde(default)]
    pub ssh: HashMap<String, SshConfig>,
}

impl Host {
    /// Whether this host holds SSH credentials for `peer`
    #[must_use]
    pub fn can_reach(&self, peer: &str) -> bool {
        self.ssh.contains_key(peer)
    }
}
