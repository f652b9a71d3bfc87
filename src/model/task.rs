//! The canonical task record, its state machine, and the unresolved-reference
//! tag used for agent/framework joins.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use super::agent::Agent;
use super::framework::Framework;
use super::ids::{AgentId, FrameworkId, TaskId};
use super::port::TaskPort;

/// A reference to another entity that may not have arrived yet.
///
/// Represented as a tagged variant rather than a nullable field so the join
/// resolver (see `store::EntityStore::resolve_waiting`) can pattern-match on
/// the tag instead of relying on sentinel values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ref<Id, T> {
    Resolved(T),
    Unresolved(Id),
}

impl<Id, T> Ref<Id, T> {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Ref::Unresolved(_))
    }
}

impl<Id: PartialEq, T> Ref<Id, T> {
    /// Whether this reference is unresolved and waiting specifically on
    /// `id` — used by the join resolver to find the subset of `waiting`
    /// tasks a newly-arrived agent/framework actually affects.
    pub fn is_unresolved_for(&self, id: &Id) -> bool {
        matches!(self, Ref::Unresolved(waiting_on) if waiting_on == id)
    }
}

/// A task's agent reference: `Resolved` carries the agent's IPv4 (which may
/// itself be absent — the agent is known, it just has no parseable IPv4).
pub type AgentRef = Ref<AgentId, Option<std::net::Ipv4Addr>>;

/// A task's framework reference.
pub type FrameworkRef = Ref<FrameworkId, Framework>;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Non-running, non-terminal (e.g. `TASK_STAGING`, `TASK_STARTING`).
    Starting,
    /// Running, health unknown.
    Running,
    /// Running, health known. See the open question on `CORE-1458` in
    /// `project.rs` — the flag is threaded through faithfully even though
    /// upstream rarely, if ever, sets it.
    RunningHealthy(bool),
    /// Reached a terminal Mesos task state; removed from the live task map
    /// on the same upsert that observes it.
    Terminal,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Terminal)
    }
}

/// The canonical, fully-joined view of a Mesos task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: Option<String>,
    pub framework: FrameworkRef,
    pub agent_ip: AgentRef,
    pub container_ip: Vec<IpAddr>,
    pub state: TaskState,
    pub ports: Vec<TaskPort>,
}

impl Task {
    /// An empty task record, the starting point for projection of a
    /// never-before-seen task id.
    pub fn empty(id: TaskId) -> Self {
        Self {
            framework: FrameworkRef::Unresolved(FrameworkId::from(String::new())),
            agent_ip: AgentRef::Unresolved(AgentId::from(String::new())),
            id,
            name: None,
            container_ip: Vec::new(),
            state: TaskState::Starting,
            ports: Vec::new(),
        }
    }

    /// `true` if either reference is still waiting on its referent.
    pub fn is_waiting(&self) -> bool {
        self.framework.is_unresolved() || self.agent_ip.is_unresolved()
    }

    /// Coalescing update ("mput" in the source): each `Some`/non-empty field
    /// in `update` overwrites the corresponding field here; absent or
    /// empty-list fields leave the prior value untouched. This is what lets
    /// a `TASK_UPDATED` event (which only carries a `TaskStatus`) update
    /// state without clobbering name/ports/etc. projected from an earlier
    /// `TASK_ADDED`.
    #[allow(clippy::too_many_arguments)]
    pub fn merge(
        &self,
        name: Option<String>,
        framework: Option<FrameworkRef>,
        agent_ip: Option<AgentRef>,
        container_ip: Vec<IpAddr>,
        state: Option<TaskState>,
        ports: Vec<TaskPort>,
    ) -> Task {
        Task {
            id: self.id.clone(),
            name: name.or_else(|| self.name.clone()),
            framework: framework.unwrap_or_else(|| self.framework.clone()),
            agent_ip: agent_ip.unwrap_or_else(|| self.agent_ip.clone()),
            container_ip: if container_ip.is_empty() {
                self.container_ip.clone()
            } else {
                container_ip
            },
            state: state.unwrap_or(self.state),
            ports: if ports.is_empty() {
                self.ports.clone()
            } else {
                ports
            },
        }
    }

    /// Resolve the framework reference in place, for the join resolver.
    pub fn with_resolved_framework(&self, framework: Framework) -> Task {
        let mut next = self.clone();
        next.framework = FrameworkRef::Resolved(framework);
        next
    }

    /// Resolve the agent reference in place, for the join resolver.
    pub fn with_resolved_agent(&self, agent: &Agent) -> Task {
        let mut next = self.clone();
        next.agent_ip = AgentRef::Resolved(agent.ipv4);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_preserves_fields_absent_from_update() {
        let base = Task {
            name: Some("n".into()),
            ports: vec![],
            ..Task::empty(TaskId::from("t1"))
        };
        let merged = base.merge(None, None, None, vec![], Some(TaskState::Running), vec![]);
        assert_eq!(merged.name.as_deref(), Some("n"));
        assert_eq!(merged.state, TaskState::Running);
    }

    #[test]
    fn merge_does_not_clobber_with_empty_container_ip() {
        let base = Task {
            container_ip: vec!["10.0.0.1".parse().unwrap()],
            ..Task::empty(TaskId::from("t1"))
        };
        let merged = base.merge(None, None, None, vec![], None, vec![]);
        assert_eq!(merged.container_ip, base.container_ip);
    }

    #[test]
    fn is_waiting_true_when_either_ref_unresolved() {
        let t = Task::empty(TaskId::from("t1"));
        assert!(t.is_waiting());
    }
}
