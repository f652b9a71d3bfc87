//! Subscriber registry: live subscribers, snapshot+delta delivery, and
//! liveness monitoring.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{mpsc, oneshot};

use crate::error::SubscribeError;
use crate::model::Task;

/// A delta (or future: resnapshot) message fanned out to subscribers. Only
/// `TaskUpdated` exists today; it carries the owned, fully-projected
/// [`Task`] rather than a reference, so subscribers never share memory
/// with the Tracker.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    TaskUpdated(Task),
}

/// Handed back to a caller whose `subscribe()` handshake succeeded: the
/// point-in-time snapshot plus a channel of subsequent deltas.
pub struct SubscribeReply {
    pub snapshot: HashMap<crate::model::TaskId, Task>,
    pub events: mpsc::UnboundedReceiver<TrackerEvent>,
    /// Dropping this is how the subscriber tells the registry it's gone —
    /// the registry's paired [`oneshot::Receiver`] resolves on drop, which
    /// is what fires the liveness monitor.
    pub alive: oneshot::Sender<std::convert::Infallible>,
}

type DeathFuture = Pin<Box<dyn Future<Output = u64> + Send>>;

async fn watch_for_death(id: u64, mut rx: oneshot::Receiver<std::convert::Infallible>) -> u64 {
    // `Infallible` can never be sent, so this only ever resolves via
    // `Err` — i.e. when the subscriber drops its `alive` guard.
    let _ = (&mut rx).await;
    id
}

/// Tracks live subscribers, gates `subscribe()` on whether the initial
/// snapshot has been applied yet, and fans out deltas.
pub struct SubscriberRegistry {
    ready: bool,
    next_id: u64,
    entries: HashMap<u64, mpsc::UnboundedSender<TrackerEvent>>,
    deaths: FuturesUnordered<DeathFuture>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self { ready: false, next_id: 0, entries: HashMap::new(), deaths: FuturesUnordered::new() }
    }

    /// Flips the registry from "no snapshot applied yet" to accepting
    /// subscribers.
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    /// Register a new subscriber, or reject with `Wait` if the initial
    /// snapshot hasn't been applied yet (`AlreadySubscribed` cannot arise
    /// from this API: every call mints a fresh subscriber identity, so
    /// there is no notion of the *same* peer subscribing twice — see
    /// DESIGN.md). On success, returns the delta receiver and the `alive`
    /// guard the caller must embed in the `SubscribeReply` it hands back —
    /// the monitor is installed (the death future is already in `deaths`)
    /// before this returns, so there is no window where a registered
    /// subscriber has no observer.
    pub fn attach(&mut self) -> Result<(mpsc::UnboundedReceiver<TrackerEvent>, oneshot::Sender<std::convert::Infallible>), SubscribeError> {
        if !self.ready {
            return Err(SubscribeError::Wait);
        }
        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = mpsc::unbounded_channel();
        let (alive_tx, alive_rx) = oneshot::channel();
        self.entries.insert(id, tx);
        self.deaths.push(Box::pin(watch_for_death(id, alive_rx)));
        Ok((rx, alive_tx))
    }

    pub fn remove(&mut self, id: u64) {
        self.entries.remove(&id);
    }

    /// Best-effort fan-out: a send failing just means that subscriber's
    /// receiver is already gone; its removal is handled by the liveness
    /// monitor, not by this call.
    pub fn broadcast(&self, event: TrackerEvent) {
        for tx in self.entries.values() {
            let _ = tx.send(event.clone());
        }
    }

    /// Resolves to the id of a subscriber whose `alive` guard was dropped.
    /// Call in a `select!` arm, guarded by `!self.deaths.is_empty()`.
    pub async fn next_death(&mut self) -> Option<u64> {
        self.deaths.next().await
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
