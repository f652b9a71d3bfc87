//! Error types for the `mesos-tracker` crate.
//!
//! All fallible operations return [`Result<T>`], an alias for
//! `std::result::Result<T, TrackerError>`. [`TrackerError`] covers:
//! - **Connect-phase errors** — redirect, unexpected HTTP status, transport
//!   failure, initial-connect timeout; all recoverable by retrying the
//!   SUBSCRIBE call
//! - **Stream-phase errors** — malformed RecordIO framing, JSON decode
//!   failure, heartbeat watchdog firing, the stream closing; all fatal to
//!   the current connection and require a fresh reconnect
//! - **Subscriber errors** — handshake timeout, not-ready, duplicate
//!   subscribe; scoped to the one rejected handshake, no effect on the
//!   Tracker itself

use reqwest::StatusCode;

/// All possible errors produced by the tracker.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The master answered 307 — it isn't the leader. Recoverable, silent:
    /// callers retry without logging.
    #[error("redirected, not the leading master")]
    Redirect,

    /// The master answered a non-2xx, non-307 status. Recoverable, logged.
    #[error("unexpected HTTP status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    /// A network/transport-level failure from `reqwest`.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// No response headers within the initial-connect deadline.
    #[error("timed out waiting for the subscribe stream to start")]
    ConnectTimeout,

    /// RecordIO framing was malformed (length prefix too long, or otherwise
    /// unparseable). Fatal to the connection.
    #[error("malformed RecordIO frame: {0}")]
    BadFrame(String),

    /// A frame's payload did not decode as JSON. Fatal to the connection.
    #[error("frame JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// No heartbeat (or SUBSCRIBED) arrived within `3 * heartbeat_interval`.
    /// Fatal to the connection.
    #[error("heartbeat watchdog fired")]
    Watchdog,

    /// The upstream stream ended (or its reader task died) without a
    /// watchdog firing first. Fatal to the connection.
    #[error("subscribe stream closed")]
    StreamClosed,

    /// Malformed configuration (bad URL, unreadable/unparsable file).
    #[error("configuration error: {0}")]
    Config(String),
}

impl TrackerError {
    /// Whether this error should terminate the Tracker actor, as opposed to
    /// being retried silently or with a log line. Only classifies errors
    /// that can occur *after* the stream has started — pre-stream
    /// transport/timeout errors are always recoverable and the connect
    /// loop never asks this question about them. Consulted by
    /// `client::report_stream_error` on every mid-stream error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TrackerError::BadFrame(_) | TrackerError::Json(_) | TrackerError::Watchdog | TrackerError::StreamClosed | TrackerError::Transport(_)
        )
    }
}

/// Why a subscribe handshake was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubscribeError {
    /// The Tracker actor isn't running at all.
    #[error("tracker is not running")]
    Init,
    /// The Tracker is running but hasn't applied its initial snapshot yet.
    #[error("tracker has not completed its initial snapshot")]
    Wait,
    /// This subscriber handle is already attached.
    #[error("subscriber is already attached")]
    AlreadySubscribed,
    /// The handshake took longer than the caller-side deadline.
    #[error("subscribe handshake timed out")]
    Timeout,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TrackerError>;
