//! Public entry point: [`TrackerHandle`] (the subscribe-side API) and
//! [`Supervisor`] (the reconnect loop that owns the actual Tracker actor
//! across its lifetime), split so a long-lived manager object can outlive
//! the individual connection tasks it spawns and restarts underneath it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{RwLock, mpsc, oneshot};
use url::Url;

use crate::config::{Config, MasterResolver};
use crate::connection::ConnectionManager;
use crate::constants::SUBSCRIBE_HANDSHAKE_TIMEOUT;
use crate::error::{SubscribeError, TrackerError};
use crate::model::{Task, TaskId};
use crate::recordio::FrameDecoder;
use crate::subscriber::TrackerEvent;
use crate::tracker::{ActorMessage, Tracker};

/// One subscriber's view onto the cluster: a point-in-time snapshot plus a
/// channel of subsequent deltas.
pub struct Subscription {
    pub snapshot: HashMap<TaskId, Task>,
    pub events: mpsc::UnboundedReceiver<TrackerEvent>,
    /// Dropping this tells the Tracker this subscriber is gone. Kept only
    /// for its `Drop` side effect — never read.
    _alive: oneshot::Sender<std::convert::Infallible>,
}

impl Subscription {
    /// Convenience wrapper over `events.recv()`, so callers don't need to
    /// import `tokio::sync::mpsc` themselves just to drain deltas.
    pub async fn next_update(&mut self) -> Option<TrackerEvent> {
        self.events.recv().await
    }
}

type MailboxCell = Arc<RwLock<Option<mpsc::UnboundedSender<ActorMessage>>>>;

/// The subscribe-side handle to a running (or not-yet-running, or
/// between-reconnects) Tracker. Cloneable and cheap — every clone shares
/// the same mailbox cell, so `subscribe()` always talks to whichever
/// Tracker actor is currently alive.
#[derive(Clone)]
pub struct TrackerHandle {
    mailbox: MailboxCell,
}

impl TrackerHandle {
    /// Attach a new subscriber. Four possible outcomes:
    /// - `Ok` — attached, with a consistent snapshot and a live delta feed.
    /// - `Err(Wait)` — a Tracker is running but hasn't applied its initial
    ///   snapshot yet.
    /// - `Err(Init)` — no Tracker is currently running at all (including:
    ///   it died and hasn't been restarted by the supervisor yet).
    /// - `Err(Timeout)` — the handshake took longer than 5s.
    ///
    /// `Err(AlreadySubscribed)` cannot be produced by this API: see
    /// DESIGN.md for why that variant is unreachable here.
    pub async fn subscribe(&self) -> Result<Subscription, SubscribeError> {
        let mailbox = { self.mailbox.read().await.clone() };
        let Some(mailbox) = mailbox else { return Err(SubscribeError::Init) };

        let (reply_tx, reply_rx) = oneshot::channel();
        if mailbox.send(ActorMessage::Subscribe(reply_tx)).is_err() {
            return Err(SubscribeError::Init);
        }

        match tokio::time::timeout(SUBSCRIBE_HANDSHAKE_TIMEOUT, reply_rx).await {
            Err(_) => Err(SubscribeError::Timeout),
            Ok(Err(_)) => Err(SubscribeError::Init),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Ok(Ok(reply))) => Ok(Subscription { snapshot: reply.snapshot, events: reply.events, _alive: reply.alive }),
        }
    }
}

/// Owns the reconnect loop: creates a fresh [`Tracker`] and connection task
/// for every attempt, and republishes the resulting [`TrackerHandle`] so
/// subscribers always reach whichever actor is currently live. Any fatal
/// error terminates the current actor; this loop immediately starts a
/// fresh one from an empty store.
pub struct Supervisor {
    resolver: Arc<dyn MasterResolver>,
    config: Config,
    mailbox: MailboxCell,
}

impl Supervisor {
    pub fn new(resolver: Arc<dyn MasterResolver>, config: Config) -> Self {
        Self { resolver, config, mailbox: Arc::new(RwLock::new(None)) }
    }

    /// A handle subscribers can hold onto across reconnects.
    pub fn handle(&self) -> TrackerHandle {
        TrackerHandle { mailbox: self.mailbox.clone() }
    }

    /// Run forever: connect, stream, and on any fatal failure tear down
    /// and restart with a fresh actor. Only returns if the master resolver
    /// itself fails unrecoverably (e.g. malformed configured URL).
    pub async fn run(self) -> TrackerError {
        loop {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.mailbox.write().await = Some(tx.clone());

            let connection_task = tokio::spawn(connection_task(self.resolver.clone(), tx, self.config.reconnect_delay(), self.config.length_prefix_cap));

            let mut actor = Tracker::new(self.config.heartbeat_multiplier);
            let error = actor.run(rx).await;

            *self.mailbox.write().await = None;
            connection_task.abort();

            tracing::error!(error = %error, "tracker actor terminated, restarting");
            tokio::time::sleep(self.config.reconnect_delay()).await;
        }
    }
}

/// Owns one Tracker's worth of connection lifecycle: retries the SUBSCRIBE
/// call (silently on redirect, logged otherwise) until it gets a streaming
/// 2xx, then forwards decoded frames into `mailbox` until the stream ends
/// or a frame fails to decode, at which point it reports the fatal error
/// and returns.
async fn connection_task(resolver: Arc<dyn MasterResolver>, mailbox: mpsc::UnboundedSender<ActorMessage>, reconnect_delay: Duration, length_prefix_cap: usize) {
    let manager = ConnectionManager::new();

    loop {
        let master = match resolver.resolve() {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(error = %e, "failed to resolve master endpoint");
                tokio::time::sleep(reconnect_delay).await;
                continue;
            }
        };

        match manager.connect(&master).await {
            Err(TrackerError::Redirect) => {
                // Recoverable, silent: a non-leading master redirecting is
                // the expected steady state until the next election, not
                // something worth a log line.
                tokio::time::sleep(reconnect_delay).await;
            }
            Err(e) => {
                tracing::error!(error = %e, master = %master, "subscribe failed, retrying");
                tokio::time::sleep(reconnect_delay).await;
            }
            Ok(stream) => {
                if stream_until_fatal(stream, &mailbox, length_prefix_cap).await.is_break() {
                    return;
                }
            }
        }
    }
}

/// Report `e` to the actor and stop this connection if it's fatal; log and
/// keep pulling chunks otherwise. Every error path reachable once the
/// stream has actually started (decode failure, transport error, stream
/// close) is fatal by construction, but routing them all through
/// `is_fatal()` keeps that classification in one place instead of baking
/// "every stream-phase error ends the connection" into three call sites
/// separately.
fn report_stream_error(e: TrackerError, mailbox: &mpsc::UnboundedSender<ActorMessage>) -> std::ops::ControlFlow<()> {
    if e.is_fatal() {
        let _ = mailbox.send(ActorMessage::Fatal(e));
        return std::ops::ControlFlow::Break(());
    }
    tracing::error!(error = %e, "non-fatal error mid-stream, continuing");
    std::ops::ControlFlow::Continue(())
}

async fn stream_until_fatal(stream: impl futures_util::Stream<Item = reqwest::Result<bytes::Bytes>>, mailbox: &mpsc::UnboundedSender<ActorMessage>, length_prefix_cap: usize) -> std::ops::ControlFlow<()> {
    let mut decoder = FrameDecoder::with_prefix_cap(length_prefix_cap);
    tokio::pin!(stream);

    loop {
        match stream.next().await {
            Some(Ok(chunk)) => match decoder.push(&chunk) {
                Ok(frames) => {
                    for frame in frames {
                        if mailbox.send(ActorMessage::Frame(frame)).is_err() {
                            return std::ops::ControlFlow::Break(());
                        }
                    }
                }
                Err(e) => {
                    if report_stream_error(e, mailbox).is_break() {
                        return std::ops::ControlFlow::Break(());
                    }
                }
            },
            Some(Err(e)) => {
                if report_stream_error(TrackerError::Transport(e), mailbox).is_break() {
                    return std::ops::ControlFlow::Break(());
                }
            }
            None => {
                if report_stream_error(TrackerError::StreamClosed, mailbox).is_break() {
                    return std::ops::ControlFlow::Break(());
                }
            }
        }
    }
}

/// Build a [`Supervisor`] against a single fixed master URL — the
/// standalone/CLI path with no leader-election facility wired in.
pub fn standalone(master_url: Url, config: Config) -> Supervisor {
    Supervisor::new(Arc::new(crate::config::StaticMasterResolver::new(master_url)), config)
}
