//! The Tracker actor: single-threaded owner of all mutable cluster state.
//! [`Tracker::run`] processes a serialized mailbox of [`ActorMessage`]s —
//! frames off the wire, subscribe requests, subscriber deaths — until a
//! fatal error ends the connection, at which point it returns that error
//! to its caller (the reconnect supervisor in `client.rs`) for a fresh
//! restart.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};

use crate::error::{SubscribeError, TrackerError};
use crate::model::wire::{RawAgentEventPayload, RawEvent, RawFrameworkEventPayload, RawFrameworkInfo, RawSubscribed};
use crate::model::{AgentId, FrameworkId, Task, TaskId};
use crate::store::EntityStore;
use crate::subscriber::{SubscribeReply, SubscriberRegistry, TrackerEvent};

/// One message in the Tracker's mailbox: frames off the wire, subscribe
/// requests, and fatal connection errors. Redirects and pre-stream
/// failures never reach the actor at all — the connection task retries
/// those itself (silently on redirect, with a log line otherwise) before
/// the Tracker is ever involved.
pub enum ActorMessage {
    /// A peer wants to attach. The reply channel carries either the
    /// snapshot + delta receiver, or the rejection reason.
    Subscribe(oneshot::Sender<Result<SubscribeReply, SubscribeError>>),
    /// One decoded RecordIO frame, not yet interpreted as a typed event.
    Frame(serde_json::Value),
    /// The connection is dead in a way that's fatal to this Tracker run
    /// (stream transport error, stream close, frame decode failure).
    Fatal(TrackerError),
}

/// Single-threaded cluster-state actor. Created fresh by the supervisor on
/// every (re)connect, so a reconnect always starts from an empty store
/// rather than carrying stale state forward.
pub struct Tracker {
    store: EntityStore,
    subscribers: SubscriberRegistry,
    heartbeat_interval_ms: Option<u64>,
    heartbeat_deadline: Option<Instant>,
    heartbeat_multiplier: u32,
}

impl Tracker {
    pub fn new(heartbeat_multiplier: u32) -> Self {
        Self {
            store: EntityStore::new(),
            subscribers: SubscriberRegistry::new(),
            heartbeat_interval_ms: None,
            heartbeat_deadline: None,
            heartbeat_multiplier,
        }
    }

    /// Run the mailbox loop until a fatal error ends the connection.
    /// Never returns `Ok` — the only way out is the error that terminated
    /// this run; the caller is expected to start a fresh Tracker afterward.
    pub async fn run(&mut self, mut mailbox: mpsc::UnboundedReceiver<ActorMessage>) -> TrackerError {
        loop {
            let heartbeat = async {
                match self.heartbeat_deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                message = mailbox.recv() => {
                    match message {
                        Some(ActorMessage::Subscribe(reply)) => self.handle_subscribe(reply),
                        Some(ActorMessage::Frame(value)) => {
                            match serde_json::from_value::<RawEvent>(value) {
                                Ok(event) => self.handle_event(event),
                                Err(e) => return TrackerError::Json(e),
                            }
                        }
                        Some(ActorMessage::Fatal(e)) => return e,
                        None => return TrackerError::StreamClosed,
                    }
                }
                _ = heartbeat, if self.heartbeat_deadline.is_some() => {
                    return TrackerError::Watchdog;
                }
                Some(dead_id) = self.subscribers.next_death(), if !self.subscribers.is_empty() => {
                    self.subscribers.remove(dead_id);
                }
            }
        }
    }

    fn handle_subscribe(&mut self, reply: oneshot::Sender<Result<SubscribeReply, SubscribeError>>) {
        let outcome = self.subscribers.attach().map(|(events, alive)| SubscribeReply { snapshot: self.store.tasks.clone(), events, alive });
        let _ = reply.send(outcome);
    }

    fn handle_event(&mut self, event: RawEvent) {
        match event.kind.as_str() {
            "SUBSCRIBED" => self.handle_subscribed(event.subscribed),
            "HEARTBEAT" => self.reset_heartbeat(),
            "TASK_ADDED" => {
                if let Some(payload) = event.task_added {
                    self.upsert_and_emit(&payload.task);
                }
            }
            "TASK_UPDATED" => {
                if let Some(payload) = event.task_updated {
                    if let Some(framework_id) = payload.framework_id {
                        if let Some(raw) = crate::model::wire::RawTask::from_status_update(payload.status, framework_id) {
                            self.upsert_and_emit(&raw);
                        }
                    }
                }
            }
            "FRAMEWORK_ADDED" => self.upsert_framework_and_resolve(event.framework_added),
            "FRAMEWORK_UPDATED" => self.upsert_framework_and_resolve(event.framework_updated),
            "FRAMEWORK_REMOVED" => {
                if let Some(payload) = event.framework_removed {
                    self.store.remove_framework(&FrameworkId::from(payload.framework_info.id.value));
                }
            }
            "AGENT_ADDED" => self.upsert_agent_and_resolve(event.agent_added),
            "AGENT_REMOVED" => {
                if let Some(payload) = event.agent_removed {
                    self.store.remove_agent(&AgentId::from(payload.agent_id.value));
                }
            }
            other => tracing::error!(kind = %other, "unknown event type, dropping"),
        }
    }

    fn handle_subscribed(&mut self, payload: Option<RawSubscribed>) {
        let Some(payload) = payload else { return };

        // Interval arrives as fractional seconds on the wire; store it in
        // milliseconds, rounding to the nearest.
        self.heartbeat_interval_ms = Some(payload.heartbeat_interval_seconds.map(|secs| (secs * 1000.0).round() as u64).unwrap_or(0));

        for entry in payload.get_agents.agents {
            self.store.upsert_agent(entry.agent_info);
        }
        for entry in payload.get_frameworks.frameworks {
            self.store.upsert_framework(entry.framework_info);
        }
        for raw_task in &payload.get_tasks.tasks {
            // No subscribers exist yet at this point, so there is nothing
            // to emit to; just populate the store.
            self.store.upsert_task(raw_task);
        }

        self.store.shrink_to_fit();
        self.subscribers.mark_ready();
        self.reset_heartbeat();
    }

    fn upsert_and_emit(&mut self, raw: &crate::model::wire::RawTask) {
        if let Some(task) = self.store.upsert_task(raw) {
            self.subscribers.broadcast(TrackerEvent::TaskUpdated(task));
        }
    }

    fn upsert_framework_and_resolve(&mut self, payload: Option<RawFrameworkEventPayload>) {
        let Some(payload) = payload else { return };
        let info: RawFrameworkInfo = payload.framework.framework_info;
        let Some(id) = self.store.upsert_framework(info) else { return };
        for task in self.store.resolve_framework(&id) {
            self.subscribers.broadcast(TrackerEvent::TaskUpdated(task));
        }
    }

    fn upsert_agent_and_resolve(&mut self, payload: Option<RawAgentEventPayload>) {
        let Some(payload) = payload else { return };
        let Some(id) = self.store.upsert_agent(payload.agent.agent_info) else { return };
        for task in self.store.resolve_agent(&id) {
            self.subscribers.broadcast(TrackerEvent::TaskUpdated(task));
        }
    }

    /// Cancel any prior watchdog timer and arm a fresh one for
    /// `heartbeat_multiplier * interval` from now. A no-op if no interval
    /// has been recorded yet (can't happen in practice — HEARTBEAT only
    /// ever follows a SUBSCRIBED that set one).
    fn reset_heartbeat(&mut self) {
        if let Some(ms) = self.heartbeat_interval_ms {
            self.heartbeat_deadline = Some(Instant::now() + Duration::from_millis(ms * self.heartbeat_multiplier as u64));
        }
    }
}

/// Snapshot type handed to a newly-attached subscriber.
pub type Snapshot = HashMap<TaskId, Task>;

#[cfg(test)]
mod tests {
    use super::*;

    fn subscribed_frame(heartbeat_secs: f64) -> serde_json::Value {
        serde_json::json!({
            "type": "SUBSCRIBED",
            "subscribed": {
                "heartbeat_interval_seconds": heartbeat_secs,
                "get_agents": {"agents": []},
                "get_frameworks": {"frameworks": []},
                "get_tasks": {"tasks": []}
            }
        })
    }

    /// No HEARTBEAT (or SUBSCRIBED) within `heartbeat_multiplier * interval`
    /// is fatal to the connection.
    #[tokio::test(start_paused = true)]
    async fn watchdog_fires_without_a_heartbeat() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ActorMessage::Frame(subscribed_frame(0.001))).unwrap();

        let mut actor = Tracker::new(1);
        let result = tokio::time::timeout(Duration::from_secs(5), actor.run(rx)).await.expect("watchdog should fire well before the test timeout");
        assert!(matches!(result, TrackerError::Watchdog));
    }

    /// A subscribe attempt before the initial snapshot has been applied is
    /// rejected with `Wait`, not silently queued.
    #[tokio::test]
    async fn subscribe_before_snapshot_is_applied_returns_wait() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut actor = Tracker::new(3);
        let run = tokio::spawn(async move { actor.run(rx).await });

        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(ActorMessage::Subscribe(reply_tx)).unwrap();
        let outcome = reply_rx.await.unwrap();
        assert_eq!(outcome.unwrap_err(), SubscribeError::Wait);

        tx.send(ActorMessage::Fatal(TrackerError::StreamClosed)).unwrap();
        let _ = run.await;
    }

    /// A task referencing an agent that hasn't arrived yet stays
    /// `Unresolved` and waiting, with no delta, until the agent shows up.
    #[tokio::test]
    async fn task_waits_for_its_agent_then_resolves() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut actor = Tracker::new(3);
        let run = tokio::spawn(async move {
            tokio::time::timeout(Duration::from_secs(2), actor.run(rx)).await.ok();
            actor
        });

        tx.send(ActorMessage::Frame(subscribed_frame(5.0))).unwrap();

        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(ActorMessage::Subscribe(reply_tx)).unwrap();
        let mut reply = reply_rx.await.unwrap().expect("snapshot is already applied");

        let task_added = serde_json::json!({
            "type": "TASK_ADDED",
            "task_added": {"task": {
                "task_id": {"value": "task1"},
                "framework_id": {"value": "fw1"},
                "agent_id": {"value": "agent1"},
                "statuses": [
                    {"task_id": {"value": "task1"}, "agent_id": {"value": "agent1"}, "state": "TASK_RUNNING", "timestamp": 1.0}
                ]
            }}
        });
        tx.send(ActorMessage::Frame(task_added)).unwrap();

        let agent_added = serde_json::json!({
            "type": "AGENT_ADDED",
            "agent_added": {"agent": {"agent_info": {"id": {"value": "agent1"}, "hostname": "10.0.0.9"}}}
        });
        tx.send(ActorMessage::Frame(agent_added)).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), reply.events.recv()).await.expect("a delta should arrive").expect("channel open");
        let TrackerEvent::TaskUpdated(task) = event;
        assert_eq!(task.agent_ip, crate::model::Ref::Resolved(Some("10.0.0.9".parse().unwrap())));

        drop(tx);
        run.abort();
    }
}
