//! Agent entity.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use super::ids::AgentId;

/// A known Mesos agent (worker node).
///
/// `ipv4` is present only if the agent's `hostname` parses strictly as an
/// IPv4 literal; a DNS name or an IPv6 literal both leave it absent, but the
/// agent is still considered known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub ipv4: Option<Ipv4Addr>,
}

impl Agent {
    /// Build an `Agent` from its id and raw `hostname` field, applying the
    /// strict-IPv4 parse rule.
    pub fn from_hostname(id: AgentId, hostname: Option<&str>) -> Self {
        let ipv4 = hostname.and_then(|h| h.parse::<Ipv4Addr>().ok());
        Self { id, ipv4 }
    }
}
