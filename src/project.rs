//! Task projection: turns a [`wire::RawTask`] into the fields that get
//! coalesced into a canonical [`Task`].
//!
//! This is deliberately split into small, independently testable pieces —
//! state derivation, container-IP derivation, and port derivation/merge —
//! treating them as separate concerns that only `project()` stitches
//! together.

use std::collections::HashMap;
use std::net::IpAddr;

use crate::model::wire::{RawContainerInfo, RawDiscoveryInfo, RawPortMapping, RawTask, RawTaskStatus};
use crate::model::{Agent, AgentId, AgentRef, Framework, FrameworkId, FrameworkRef, Protocol, Task, TaskPort, TaskState, Vip};

/// The fields computed from one raw task, ready to be folded into a prior
/// [`Task`] via [`Task::merge`]. Every field here uses the same
/// absent/empty-means-"not carried by this event" convention as the merge
/// it feeds: an empty or absent value never clobbers a previously-known
/// one.
pub struct Projected {
    pub name: Option<String>,
    pub framework: FrameworkRef,
    pub agent_ip: AgentRef,
    pub container_ip: Vec<IpAddr>,
    pub state: TaskState,
    pub ports: Vec<TaskPort>,
}

/// Project a raw task against the current entity store contents.
pub fn project(raw: &RawTask, agents: &HashMap<AgentId, Agent>, frameworks: &HashMap<FrameworkId, Framework>) -> Projected {
    let framework = resolve_framework(raw.framework_id.as_ref(), frameworks);
    let agent_ip = resolve_agent(raw.agent_id.as_ref(), agents);
    let latest_status = latest_status(&raw.statuses);
    let container_ip = latest_status.map(container_ips).unwrap_or_default();
    let state = latest_status.map(derive_state).unwrap_or(TaskState::Starting);
    let ports = derive_ports(raw.container.as_ref(), raw.discovery.as_ref());

    Projected {
        name: raw.name.clone(),
        framework,
        agent_ip,
        container_ip,
        state,
        ports,
    }
}

fn resolve_framework(framework_id: Option<&crate::model::wire::RawFrameworkId>, frameworks: &HashMap<FrameworkId, Framework>) -> FrameworkRef {
    let Some(raw_id) = framework_id else {
        // No framework_id at all on this event: treat as unresolved against
        // an empty id rather than panic. In practice every genuine task
        // carries one.
        return FrameworkRef::Unresolved(FrameworkId::from(String::new()));
    };
    let id = FrameworkId::from(raw_id.value.clone());
    match frameworks.get(&id) {
        Some(framework) => FrameworkRef::Resolved(framework.clone()),
        None => FrameworkRef::Unresolved(id),
    }
}

fn resolve_agent(agent_id: Option<&crate::model::wire::RawAgentId>, agents: &HashMap<AgentId, Agent>) -> AgentRef {
    let Some(raw_id) = agent_id else {
        return AgentRef::Unresolved(AgentId::from(String::new()));
    };
    let id = AgentId::from(raw_id.value.clone());
    match agents.get(&id) {
        // Resolved even when the agent's own IPv4 is absent — the agent is
        // known, so this is no longer "unresolved".
        Some(agent) => AgentRef::Resolved(agent.ipv4),
        None => AgentRef::Unresolved(id),
    }
}

/// Pick the status with the maximum `timestamp`. A missing timestamp sorts
/// before any present one, matching the natural reading of "pick the
/// latest" when upstream omits the field.
fn latest_status(statuses: &[RawTaskStatus]) -> Option<&RawTaskStatus> {
    statuses
        .iter()
        .max_by(|a, b| a.timestamp.partial_cmp(&b.timestamp).unwrap_or(std::cmp::Ordering::Equal))
}

/// Collect every IP literal (v4 or v6) reachable from the status's
/// `container_status.network_infos[*].ip_addresses[*].ip_address`. Entries
/// that don't parse are silently skipped: a malformed IP from upstream
/// must not crash the projector.
fn container_ips(status: &RawTaskStatus) -> Vec<IpAddr> {
    status
        .container_status
        .iter()
        .flat_map(|cs| cs.network_infos.iter())
        .flat_map(|ni| ni.ip_addresses.iter())
        .filter_map(|addr| addr.ip_address.as_deref())
        .filter_map(|s| s.parse::<IpAddr>().ok())
        .collect()
}

/// Derive [`TaskState`] from a status's `state` string. Note the
/// intended `running_healthy` behavior is preserved even though upstream's
/// `CORE-1458` bug means `healthy` is rarely, if ever, actually present on a
/// live status — that asymmetry is upstream's to fix, not this projector's.
fn derive_state(status: &RawTaskStatus) -> TaskState {
    match status.state.as_deref() {
        Some("TASK_FINISHED" | "TASK_FAILED" | "TASK_KILLED" | "TASK_ERROR" | "TASK_DROPPED" | "TASK_GONE") => TaskState::Terminal,
        Some("TASK_RUNNING") => match status.healthy {
            Some(healthy) => TaskState::RunningHealthy(healthy),
            None => TaskState::Running,
        },
        _ => TaskState::Starting,
    }
}

/// Container-level port mappings, depending on `container.type`.
fn container_port_mappings(container: Option<&RawContainerInfo>) -> Vec<RawPortMapping> {
    let Some(container) = container else {
        return Vec::new();
    };
    match container.container_type.as_deref() {
        Some("MESOS") => container.network_infos.iter().flat_map(|ni| ni.port_mappings.iter().cloned()).collect(),
        Some("DOCKER") => container.docker.iter().flat_map(|d| d.port_mappings.iter().cloned()).collect(),
        _ => Vec::new(),
    }
}

/// Discovery ports plus their VIP/scope labels.
fn discovery_ports(discovery: Option<&RawDiscoveryInfo>) -> Vec<TaskPort> {
    let Some(ports) = discovery.and_then(|d| d.ports.as_ref()) else {
        return Vec::new();
    };

    ports
        .ports
        .iter()
        .map(|p| {
            let protocol = Protocol::parse(p.protocol.as_deref());
            let mut vips = Vec::new();
            let mut container_scoped = false;
            if let Some(labels) = &p.labels {
                for label in &labels.labels {
                    let key = label.key.as_deref().unwrap_or_default();
                    if key.eq_ignore_ascii_case("vip") || key.to_ascii_lowercase().starts_with("vip") {
                        if let Some(value) = &label.value {
                            vips.push(value.clone());
                        }
                    }
                    if key == "network-scope" && label.value.as_deref() == Some("container") {
                        container_scoped = true;
                    }
                }
            }

            let vip = if vips.is_empty() {
                None
            } else if container_scoped {
                Some(Vip::Container(vips))
            } else {
                Some(Vip::Host(vips))
            };

            if container_scoped {
                TaskPort {
                    name: p.name.clone(),
                    host_port: None,
                    port: p.number,
                    protocol,
                    vip,
                }
            } else {
                TaskPort {
                    name: p.name.clone(),
                    host_port: p.number,
                    port: None,
                    protocol,
                    vip,
                }
            }
        })
        .collect()
}

/// A discovery port always carries exactly one of `port`/`host_port`. That
/// single populated value is the "anchor" used to recognize when a container
/// port mapping describes the same logical port: discovery's `number` is the
/// app's declared (container-side) listening port regardless of VIP scope,
/// so the anchor is always compared against a mapping's `container_port` —
/// never its `host_port`, which is merely the dynamically-assigned value a
/// matching mapping fills in.
fn anchor(port: &TaskPort) -> Option<u16> {
    port.port.or(port.host_port)
}

/// Merge container port mappings into discovery ports.
///
/// Discovery is authoritative for `name`/`vip`; a mapping is authoritative
/// for the numeric `(port, host_port)` pair once it's recognized as
/// describing the same port as a discovery entry. That recognition is by
/// the mapping's `container_port` matching the entry's anchor — never its
/// `host_port`, which would let an unrelated mapping whose `host_port`
/// happens to coincide with an entry's number wrongly absorb that entry. A
/// mapping matching no discovery entry becomes its own standalone entry with
/// no name/VIP.
pub fn derive_ports(container: Option<&RawContainerInfo>, discovery: Option<&RawDiscoveryInfo>) -> Vec<TaskPort> {
    let mut entries: Vec<TaskPort> = discovery_ports(discovery);
    let mut standalone: Vec<TaskPort> = Vec::new();

    for mapping in container_port_mappings(container) {
        let protocol = Protocol::parse(mapping.protocol.as_deref());
        let matched = entries.iter_mut().find(|entry| entry.protocol == protocol && anchor(entry).is_some() && anchor(entry) == mapping.container_port);

        match matched {
            Some(entry) => {
                entry.port = mapping.container_port;
                entry.host_port = mapping.host_port;
            }
            None => standalone.push(TaskPort {
                name: None,
                host_port: mapping.host_port,
                port: mapping.container_port,
                protocol,
                vip: None,
            }),
        }
    }

    entries.extend(standalone);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::wire::{RawDiscoveryPort, RawDockerInfo, RawLabel, RawLabels, RawPorts};

    #[test]
    fn state_derivation_terminal_states() {
        for state in ["TASK_FINISHED", "TASK_FAILED", "TASK_KILLED", "TASK_ERROR", "TASK_DROPPED", "TASK_GONE"] {
            let status = RawTaskStatus { state: Some(state.into()), ..Default::default() };
            assert_eq!(derive_state(&status), TaskState::Terminal, "{state}");
        }
    }

    #[test]
    fn state_derivation_running_without_health() {
        let status = RawTaskStatus { state: Some("TASK_RUNNING".into()), ..Default::default() };
        assert_eq!(derive_state(&status), TaskState::Running);
    }

    #[test]
    fn state_derivation_running_with_health() {
        let status = RawTaskStatus { state: Some("TASK_RUNNING".into()), healthy: Some(true), ..Default::default() };
        assert_eq!(derive_state(&status), TaskState::RunningHealthy(true));
    }

    #[test]
    fn state_derivation_unknown_defaults_to_starting() {
        let status = RawTaskStatus { state: Some("TASK_STAGING".into()), ..Default::default() };
        assert_eq!(derive_state(&status), TaskState::Starting);
    }

    #[test]
    fn latest_status_picks_max_timestamp() {
        let statuses = vec![
            RawTaskStatus { timestamp: Some(1.0), state: Some("TASK_STARTING".into()), ..Default::default() },
            RawTaskStatus { timestamp: Some(5.0), state: Some("TASK_RUNNING".into()), ..Default::default() },
            RawTaskStatus { timestamp: Some(2.0), state: Some("TASK_FAILED".into()), ..Default::default() },
        ];
        assert_eq!(derive_state(latest_status(&statuses).unwrap()), TaskState::Running);
    }

    #[test]
    fn container_ips_skips_unparseable_entries() {
        let status = RawTaskStatus {
            container_status: Some(crate::model::wire::RawContainerStatus {
                network_infos: vec![crate::model::wire::RawNetworkInfo {
                    ip_addresses: vec![
                        crate::model::wire::RawIpAddress { ip_address: Some("10.0.0.1".into()) },
                        crate::model::wire::RawIpAddress { ip_address: Some("not-an-ip".into()) },
                        crate::model::wire::RawIpAddress { ip_address: Some("::1".into()) },
                    ],
                    ..Default::default()
                }],
            }),
            ..Default::default()
        };
        let ips = container_ips(&status);
        assert_eq!(ips.len(), 2);
    }

    fn vip_label(key: &str, value: &str) -> RawLabel {
        RawLabel { key: Some(key.into()), value: Some(value.into()) }
    }

    #[test]
    fn port_merge_docker_mapping_fills_host_port_blank() {
        // DOCKER container with a docker port mapping and a host-scoped
        // discovery port carrying a VIP label.
        let container = RawContainerInfo {
            container_type: Some("DOCKER".into()),
            docker: Some(RawDockerInfo {
                port_mappings: vec![RawPortMapping {
                    container_port: Some(8080),
                    host_port: Some(31000),
                    protocol: Some("tcp".into()),
                }],
            }),
            ..Default::default()
        };
        let discovery = RawDiscoveryInfo {
            ports: Some(RawPorts {
                ports: vec![RawDiscoveryPort {
                    number: Some(8080),
                    protocol: Some("tcp".into()),
                    name: None,
                    labels: Some(RawLabels { labels: vec![vip_label("VIP_0", "/svc:80")] }),
                }],
            }),
        };

        let ports = derive_ports(Some(&container), Some(&discovery));
        assert_eq!(ports.len(), 1);
        let port = &ports[0];
        assert_eq!(port.protocol, Protocol::Tcp);
        assert_eq!(port.port, Some(8080));
        assert_eq!(port.host_port, Some(31000));
        assert_eq!(port.vip, Some(Vip::Host(vec!["/svc:80".into()])));
    }

    #[test]
    fn port_merge_container_scoped_vip_fills_port_not_host_port() {
        let container = RawContainerInfo {
            container_type: Some("MESOS".into()),
            network_infos: vec![crate::model::wire::RawNetworkInfo {
                port_mappings: vec![RawPortMapping {
                    container_port: Some(9000),
                    host_port: Some(32000),
                    protocol: Some("tcp".into()),
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let discovery = RawDiscoveryInfo {
            ports: Some(RawPorts {
                ports: vec![RawDiscoveryPort {
                    number: Some(9000),
                    protocol: Some("tcp".into()),
                    name: Some("api".into()),
                    labels: Some(RawLabels {
                        labels: vec![vip_label("VIP_0", "/api:443"), vip_label("network-scope", "container")],
                    }),
                }],
            }),
        };

        let ports = derive_ports(Some(&container), Some(&discovery));
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].vip, Some(Vip::Container(vec!["/api:443".into()])));
        assert_eq!(ports[0].host_port, Some(32000));
    }

    #[test]
    fn port_merge_unmatched_mapping_becomes_its_own_entry() {
        let container = RawContainerInfo {
            container_type: Some("MESOS".into()),
            network_infos: vec![crate::model::wire::RawNetworkInfo {
                port_mappings: vec![RawPortMapping {
                    container_port: Some(7000),
                    host_port: Some(33000),
                    protocol: Some("udp".into()),
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let ports = derive_ports(Some(&container), None);
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].protocol, Protocol::Udp);
        assert_eq!(ports[0].port, Some(7000));
        assert_eq!(ports[0].host_port, Some(33000));
        assert!(ports[0].vip.is_none());
    }

    #[test]
    fn port_merge_does_not_match_on_host_port_coincidence() {
        // The mapping's host_port (9000) coincidentally equals the discovery
        // entry's anchor, but its container_port (7000) does not — this must
        // not merge, since matching is only ever against container_port.
        let container = RawContainerInfo {
            container_type: Some("MESOS".into()),
            network_infos: vec![crate::model::wire::RawNetworkInfo {
                port_mappings: vec![RawPortMapping {
                    container_port: Some(7000),
                    host_port: Some(9000),
                    protocol: Some("tcp".into()),
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let discovery = RawDiscoveryInfo {
            ports: Some(RawPorts {
                ports: vec![RawDiscoveryPort { number: Some(9000), protocol: Some("tcp".into()), name: Some("api".into()), labels: None }],
            }),
        };

        let ports = derive_ports(Some(&container), Some(&discovery));
        assert_eq!(ports.len(), 2, "the unrelated mapping must stand alone, not absorb the discovery entry");
        assert!(ports.iter().any(|p| p.name.as_deref() == Some("api") && p.host_port == Some(9000) && p.port.is_none()));
        assert!(ports.iter().any(|p| p.name.is_none() && p.port == Some(7000) && p.host_port == Some(9000)));
    }

    #[test]
    fn host_container_type_yields_no_port_mappings() {
        let container = RawContainerInfo { container_type: Some("HOST".into()), ..Default::default() };
        assert!(container_port_mappings(Some(&container)).is_empty());
    }
}
