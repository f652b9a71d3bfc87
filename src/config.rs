//! Configuration layer: master endpoint resolution plus the small set of
//! runtime tunables (reconnect delay, RecordIO length-prefix cap, heartbeat
//! multiplier, log level), loaded from TOML with environment overrides,
//! collecting everything the supervisor needs behind one struct.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{Result, TrackerError};
use crate::recordio::MAX_LENGTH_PREFIX_BYTES;

/// How many multiples of the server-advertised heartbeat interval the
/// watchdog waits before firing before declaring the connection dead.
/// Exposed as a tunable mainly so tests can shrink it.
pub const DEFAULT_HEARTBEAT_MULTIPLIER: u32 = 3;

/// Fixed reconnect backoff on redirect or connect failure. No exponential
/// backoff: a non-leading master redirects immediately, so there's nothing
/// to back off from beyond giving the cluster a moment to elect a leader.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(100);

/// Runtime configuration for a [`crate::client::Supervisor`].
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Mesos master's Operator API, e.g.
    /// `http://master.mesos:5050`. Only used by [`StaticMasterResolver`];
    /// a real leader-election resolver ignores this field entirely.
    pub master_url: Option<Url>,
    /// Fixed delay before retrying the SUBSCRIBE call after a redirect or
    /// connect failure, in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Upper bound on a RecordIO decimal length prefix, in ASCII bytes.
    #[serde(default = "default_length_prefix_cap")]
    pub length_prefix_cap: usize,
    /// Multiplier applied to the server-advertised heartbeat interval to
    /// get the watchdog deadline.
    #[serde(default = "default_heartbeat_multiplier")]
    pub heartbeat_multiplier: u32,
    /// `tracing` filter directive, e.g. `"info"` or `"mesos_tracker=debug"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY.as_millis() as u64
}

fn default_length_prefix_cap() -> usize {
    MAX_LENGTH_PREFIX_BYTES
}

fn default_heartbeat_multiplier() -> u32 {
    DEFAULT_HEARTBEAT_MULTIPLIER
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            master_url: None,
            reconnect_delay_ms: default_reconnect_delay_ms(),
            length_prefix_cap: default_length_prefix_cap(),
            heartbeat_multiplier: default_heartbeat_multiplier(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load from a TOML file, then apply `MESOS_TRACKER_*` environment
    /// overrides on top (master URL, reconnect delay, log level).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| TrackerError::Config(format!("reading {}: {e}", path.as_ref().display())))?;
        let mut config: Config = toml::from_str(&text).map_err(|e| TrackerError::Config(format!("parsing {}: {e}", path.as_ref().display())))?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("MESOS_TRACKER_MASTER_URL") {
            self.master_url = Some(Url::parse(&url).map_err(|e| TrackerError::Config(format!("MESOS_TRACKER_MASTER_URL: {e}")))?);
        }
        if let Ok(delay) = std::env::var("MESOS_TRACKER_RECONNECT_DELAY_MS") {
            self.reconnect_delay_ms = delay.parse().map_err(|_| TrackerError::Config("MESOS_TRACKER_RECONNECT_DELAY_MS must be an integer".into()))?;
        }
        if let Ok(level) = std::env::var("MESOS_TRACKER_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Resolves the Mesos master to contact for the next SUBSCRIBE attempt.
/// Leader election (which master currently holds leadership) lives outside
/// this crate; this trait is the seam a caller plugs that facility into,
/// so the base URL can be swapped without touching call sites.
pub trait MasterResolver: Send + Sync {
    /// Return the URL to POST the SUBSCRIBE call to. Called once per
    /// connection attempt, so a real implementation is free to change its
    /// answer after observing a redirect from the previous attempt.
    fn resolve(&self) -> Result<Url>;
}

/// A [`MasterResolver`] that always returns the same, fixed URL. Useful
/// standalone (single-master test clusters, the CLI binary) where there is
/// no leader election to delegate to.
#[derive(Debug, Clone)]
pub struct StaticMasterResolver(Url);

impl StaticMasterResolver {
    pub fn new(url: Url) -> Self {
        Self(url)
    }
}

impl MasterResolver for StaticMasterResolver {
    fn resolve(&self) -> Result<Url> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_tunables() {
        let config = Config::default();
        assert_eq!(config.heartbeat_multiplier, 3);
        assert_eq!(config.length_prefix_cap, 12);
        assert_eq!(config.reconnect_delay(), Duration::from_millis(100));
    }

    #[test]
    fn static_resolver_always_returns_same_url() {
        let url = Url::parse("http://master.mesos:5050").unwrap();
        let resolver = StaticMasterResolver::new(url.clone());
        assert_eq!(resolver.resolve().unwrap(), url);
        assert_eq!(resolver.resolve().unwrap(), url);
    }
}
