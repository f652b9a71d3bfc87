//! Task port records and the discovery/mapping merge.

use serde::{Deserialize, Serialize};

/// Transport protocol of a task port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// Parse a Mesos wire protocol string (`"tcp"`/`"udp"`, case-insensitive).
    /// Unrecognized values default to `Tcp`, matching the overwhelming
    /// majority of real-world discovery info which omits the field.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("udp") => Protocol::Udp,
            _ => Protocol::Tcp,
        }
    }
}

/// Virtual-IP labels attached to a port, tagged with the scope they were
/// declared at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vip {
    /// `network-scope: container` — the VIPs route to the container port.
    Container(Vec<String>),
    /// Default scope — the VIPs route to the host port.
    Host(Vec<String>),
}

/// One port a task exposes, reconciled from discovery info and (if present)
/// the container runtime's port mappings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPort {
    pub name: Option<String>,
    pub host_port: Option<u16>,
    pub port: Option<u16>,
    pub protocol: Protocol,
    pub vip: Option<Vip>,
}
