//! Raw JSON shapes decoded off the Operator API event stream.
//!
//! These mirror the Mesos v1 scheduler/operator JSON encoding, trimmed to
//! the fields the rest of this crate actually reads. Every field the
//! projector doesn't strictly need is left out, and everything that's left
//! in is `Option` with `#[serde(default)]`: upstream has a long history of
//! only sending the fields relevant to a given event, and a missing field
//! must project to absent rather than fail the frame.

use serde::Deserialize;

use super::ids::{AgentId, FrameworkId, TaskId};

#[derive(Debug, Clone, Deserialize)]
pub struct RawTaskId {
    pub value: String,
}

impl From<RawTaskId> for TaskId {
    fn from(raw: RawTaskId) -> Self {
        TaskId(raw.value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAgentId {
    pub value: String,
}

impl From<RawAgentId> for AgentId {
    fn from(raw: RawAgentId) -> Self {
        AgentId(raw.value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFrameworkId {
    pub value: String,
}

impl From<RawFrameworkId> for FrameworkId {
    fn from(raw: RawFrameworkId) -> Self {
        FrameworkId(raw.value)
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAgentInfo {
    #[serde(default)]
    pub id: Option<RawAgentId>,
    #[serde(default)]
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAgentEntry {
    pub agent_info: RawAgentInfo,
}

// ---------------------------------------------------------------------------
// Frameworks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawFrameworkInfo {
    #[serde(default)]
    pub id: Option<RawFrameworkId>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFrameworkEntry {
    pub framework_info: RawFrameworkInfo,
}

// ---------------------------------------------------------------------------
// Ports (container mappings + discovery info)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPortMapping {
    #[serde(default)]
    pub container_port: Option<u16>,
    #[serde(default)]
    pub host_port: Option<u16>,
    #[serde(default)]
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawNetworkInfo {
    #[serde(default)]
    pub ip_addresses: Vec<RawIpAddress>,
    #[serde(default)]
    pub port_mappings: Vec<RawPortMapping>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawIpAddress {
    #[serde(default)]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDockerInfo {
    #[serde(default)]
    pub port_mappings: Vec<RawPortMapping>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawContainerInfo {
    #[serde(default, rename = "type")]
    pub container_type: Option<String>,
    #[serde(default)]
    pub network_infos: Vec<RawNetworkInfo>,
    #[serde(default)]
    pub docker: Option<RawDockerInfo>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLabel {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawLabels {
    #[serde(default)]
    pub labels: Vec<RawLabel>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDiscoveryPort {
    #[serde(default)]
    pub number: Option<u16>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: Option<RawLabels>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPorts {
    #[serde(default)]
    pub ports: Vec<RawDiscoveryPort>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDiscoveryInfo {
    #[serde(default)]
    pub ports: Option<RawPorts>,
}

// ---------------------------------------------------------------------------
// Task status & task info
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawContainerStatus {
    #[serde(default)]
    pub network_infos: Vec<RawNetworkInfo>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTaskStatus {
    #[serde(default)]
    pub task_id: Option<RawTaskId>,
    #[serde(default)]
    pub agent_id: Option<RawAgentId>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub healthy: Option<bool>,
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub container_status: Option<RawContainerStatus>,
}

/// A uniform view of "the task-shaped thing a projectable event carries".
///
/// `TASK_ADDED` supplies one straight from `task_added.task`; `TASK_UPDATED`
/// is assembled by the dispatcher from `task_updated.status` plus the
/// top-level `framework_id`, which is why every field here is optional
/// even though a genuine `TaskInfo` always has a task id, framework id,
/// and agent id.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTask {
    pub task_id: RawTaskId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub framework_id: Option<RawFrameworkId>,
    #[serde(default)]
    pub agent_id: Option<RawAgentId>,
    #[serde(default)]
    pub statuses: Vec<RawTaskStatus>,
    #[serde(default)]
    pub container: Option<RawContainerInfo>,
    #[serde(default)]
    pub discovery: Option<RawDiscoveryInfo>,
}

impl RawTask {
    /// Build the `RawTask` view the projector expects out of a `TASK_UPDATED`
    /// event: the status is the sole entry in `statuses`, `framework_id`
    /// comes from the top-level event field (merged in by the dispatcher),
    /// and `agent_id` comes from the status itself when present.
    pub fn from_status_update(status: RawTaskStatus, framework_id: RawFrameworkId) -> Option<Self> {
        let task_id = status.task_id.clone()?;
        Some(RawTask {
            task_id,
            name: None,
            framework_id: Some(framework_id),
            agent_id: status.agent_id.clone(),
            statuses: vec![status],
            container: None,
            discovery: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Top-level event envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawGetAgents {
    #[serde(default)]
    pub agents: Vec<RawAgentEntry>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawGetFrameworks {
    #[serde(default)]
    pub frameworks: Vec<RawFrameworkEntry>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawGetTasks {
    #[serde(default)]
    pub tasks: Vec<RawTask>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSubscribed {
    #[serde(default)]
    pub heartbeat_interval_seconds: Option<f64>,
    #[serde(default)]
    pub get_agents: RawGetAgents,
    #[serde(default)]
    pub get_frameworks: RawGetFrameworks,
    #[serde(default)]
    pub get_tasks: RawGetTasks,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTaskAddedPayload {
    pub task: RawTask,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTaskUpdatedPayload {
    pub status: RawTaskStatus,
    #[serde(default)]
    pub framework_id: Option<RawFrameworkId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFrameworkEventPayload {
    pub framework: RawFrameworkEntry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFrameworkInfoEnvelope {
    pub id: RawFrameworkId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFrameworkRemovedPayload {
    pub framework_info: RawFrameworkInfoEnvelope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAgentEventPayload {
    pub agent: RawAgentEntry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAgentRemovedPayload {
    pub agent_id: RawAgentId,
}

/// A single decoded RecordIO frame: the Operator API's tagged event union.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subscribed: Option<RawSubscribed>,
    #[serde(default)]
    pub task_added: Option<RawTaskAddedPayload>,
    #[serde(default)]
    pub task_updated: Option<RawTaskUpdatedPayload>,
    #[serde(default)]
    pub framework_added: Option<RawFrameworkEventPayload>,
    #[serde(default)]
    pub framework_updated: Option<RawFrameworkEventPayload>,
    #[serde(default)]
    pub framework_removed: Option<RawFrameworkRemovedPayload>,
    #[serde(default)]
    pub agent_added: Option<RawAgentEventPayload>,
    #[serde(default)]
    pub agent_removed: Option<RawAgentRemovedPayload>,
}
