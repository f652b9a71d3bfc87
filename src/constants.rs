//! Crate-wide constants that aren't configurable — fixed wire-protocol and
//! handshake facts, not deployment tunables. The configurable analogues
//! (reconnect delay, length-prefix cap, heartbeat multiplier) live in
//! [`crate::config::Config`].

use std::time::Duration;

/// No response headers within this long and the SUBSCRIBE attempt is a
/// timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a caller's `subscribe()` handshake waits for the Tracker actor
/// to reply before giving up.
pub const SUBSCRIBE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
