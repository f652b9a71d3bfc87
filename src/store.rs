//! Entity store: the agents/frameworks/tasks collections the Tracker owns
//! exclusively, plus the upsert/diff/join-resolution machinery.

use std::collections::{HashMap, HashSet};

use crate::diff;
use crate::model::wire::{RawAgentInfo, RawFrameworkInfo, RawTask};
use crate::model::{Agent, AgentId, Framework, FrameworkId, Task, TaskId, TaskState};
use crate::project;

/// Build an [`Agent`] from its wire shape, skipping entries with no id (a
/// genuine `AgentAdded` always carries one; a malformed event must not
/// panic the store).
fn agent_from_raw(info: RawAgentInfo) -> Option<Agent> {
    let id = info.id?;
    Some(Agent::from_hostname(AgentId::from(id.value), info.hostname.as_deref()))
}

/// Build a [`Framework`] from its wire shape, same id-required caveat as
/// [`agent_from_raw`].
fn framework_from_raw(info: RawFrameworkInfo) -> Option<Framework> {
    let id = info.id?;
    Some(Framework { id: FrameworkId::from(id.value), name: info.name })
}

/// Owns `agents`, `frameworks`, `tasks`, and the `waiting` index.
#[derive(Debug, Default)]
pub struct EntityStore {
    pub agents: HashMap<AgentId, Agent>,
    pub frameworks: HashMap<FrameworkId, Framework>,
    pub tasks: HashMap<TaskId, Task>,
    pub waiting: HashSet<TaskId>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert/replace an agent from its wire shape (`AGENT_ADDED`). Does
    /// *not* resolve waiting tasks — call [`Self::resolve_agent`] after.
    pub fn upsert_agent(&mut self, info: RawAgentInfo) -> Option<AgentId> {
        let agent = agent_from_raw(info)?;
        let id = agent.id.clone();
        self.agents.insert(id.clone(), agent);
        Some(id)
    }

    pub fn remove_agent(&mut self, id: &AgentId) {
        // No cascade to tasks: tasks keep whatever agent_ip was last
        // projected.
        self.agents.remove(id);
    }

    /// Insert/replace a framework from its wire shape. Does not resolve
    /// waiting tasks — call [`Self::resolve_framework`] after.
    pub fn upsert_framework(&mut self, info: RawFrameworkInfo) -> Option<FrameworkId> {
        let framework = framework_from_raw(info)?;
        let id = framework.id.clone();
        self.frameworks.insert(id.clone(), framework);
        Some(id)
    }

    pub fn remove_framework(&mut self, id: &FrameworkId) {
        self.frameworks.remove(id);
    }

    /// Project `raw` against the current agents/frameworks, coalesce-merge
    /// it onto whatever's already stored for this task id, and apply the
    /// diff-gated upsert below. Returns the new task iff something changed
    /// (a no-op projection returns `None` and touches nothing).
    pub fn upsert_task(&mut self, raw: &RawTask) -> Option<Task> {
        let id = TaskId::from(raw.task_id.value.clone());
        let prev = self.tasks.get(&id).cloned().unwrap_or_else(|| Task::empty(id.clone()));
        let projected = project::project(raw, &self.agents, &self.frameworks);
        let next = prev.merge(
            projected.name,
            Some(projected.framework),
            Some(projected.agent_ip),
            projected.container_ip,
            Some(projected.state),
            projected.ports,
        );
        self.apply(id, prev, next)
    }

    /// Re-resolve every waiting task whose `agent_ip` is `Unresolved(id)`,
    /// now that `id`'s agent has arrived.
    pub fn resolve_agent(&mut self, id: &AgentId) -> Vec<Task> {
        let Some(agent) = self.agents.get(id).cloned() else { return Vec::new() };
        let waiting: Vec<TaskId> = self.waiting.iter().cloned().collect();
        let mut changed = Vec::new();
        for task_id in waiting {
            let Some(prev) = self.tasks.get(&task_id).cloned() else { continue };
            if prev.agent_ip.is_unresolved_for(id) {
                let next = prev.with_resolved_agent(&agent);
                if let Some(task) = self.apply(task_id, prev, next) {
                    changed.push(task);
                }
            }
        }
        changed
    }

    /// Re-resolve every waiting task whose `framework` is `Unresolved(id)`.
    pub fn resolve_framework(&mut self, id: &FrameworkId) -> Vec<Task> {
        let Some(framework) = self.frameworks.get(id).cloned() else { return Vec::new() };
        let waiting: Vec<TaskId> = self.waiting.iter().cloned().collect();
        let mut changed = Vec::new();
        for task_id in waiting {
            let Some(prev) = self.tasks.get(&task_id).cloned() else { continue };
            if prev.framework.is_unresolved_for(id) {
                let next = prev.with_resolved_framework(framework.clone());
                if let Some(task) = self.apply(task_id, prev, next) {
                    changed.push(task);
                }
            }
        }
        changed
    }

    /// Diff-gated commit of a projected/resolved task record: if nothing
    /// changed, returns `None` and leaves the store untouched; otherwise
    /// removes terminal tasks (and drops them from `waiting`) or stores the
    /// new record and updates `waiting` membership.
    fn apply(&mut self, id: TaskId, prev: Task, next: Task) -> Option<Task> {
        if !diff::has_changed(&prev, &next) {
            return None;
        }
        tracing::debug!(task_id = %id, diff = ?diff::diff_fields(&prev, &next), "task diff");

        if next.state == TaskState::Terminal {
            self.tasks.remove(&id);
            self.waiting.remove(&id);
        } else {
            if next.is_waiting() {
                self.waiting.insert(id.clone());
            } else {
                self.waiting.remove(&id);
            }
            self.tasks.insert(id, next.clone());
        }
        Some(next)
    }

    /// Shrink the backing maps after a large snapshot load, the idiomatic
    /// analogue of requesting a GC/compaction when the platform has no
    /// VM-level hook for it.
    pub fn shrink_to_fit(&mut self) {
        self.agents.shrink_to_fit();
        self.frameworks.shrink_to_fit();
        self.tasks.shrink_to_fit();
        self.waiting.shrink_to_fit();
    }
}
