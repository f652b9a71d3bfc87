//! Standalone CLI: connect to a single Mesos master's Operator API, print
//! the initial task snapshot, then stream deltas as they arrive.
//!
//! # Usage
//!
//! ```sh
//! export MESOS_TRACKER_MASTER_URL="http://master.mesos:5050/api/v1"
//! cargo run --bin mesos-tracker --features cli
//! ```
//!
//! A `config.toml` next to the binary is loaded first if present; every
//! `MESOS_TRACKER_*` environment variable overrides it afterward.

use std::env;

use mesos_tracker::{Config, client};

#[tokio::main]
async fn main() -> mesos_tracker::error::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    let config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(_) => {
            let mut config = Config::default();
            // No file on disk is fine as long as the master URL shows up
            // through the environment instead.
            if let Ok(url) = env::var("MESOS_TRACKER_MASTER_URL") {
                config.master_url = Some(url.parse().map_err(|e| mesos_tracker::TrackerError::Config(format!("MESOS_TRACKER_MASTER_URL: {e}")))?);
            }
            config
        }
    };

    let master = config.master_url.clone().expect("set MESOS_TRACKER_MASTER_URL or master_url in config.toml");

    println!("Connecting to {master}…");
    let supervisor = client::standalone(master, config);
    let handle = supervisor.handle();
    tokio::spawn(supervisor.run());

    let mut subscription = loop {
        match handle.subscribe().await {
            Ok(sub) => break sub,
            Err(mesos_tracker::SubscribeError::Init) | Err(mesos_tracker::SubscribeError::Wait) => {
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            }
            Err(e) => return Err(mesos_tracker::TrackerError::Config(format!("subscribe: {e}"))),
        }
    };

    println!("Snapshot: {} task(s)", subscription.snapshot.len());
    for task in subscription.snapshot.values() {
        println!("  {task:?}");
    }

    println!("Listening for deltas (Ctrl-C to exit)…");
    while let Some(event) = subscription.next_update().await {
        println!("{event:?}");
    }

    println!("Delta stream closed.");
    Ok(())
}
