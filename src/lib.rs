//! # mesos-tracker
//!
//! Subscribes to a Mesos master's Operator API event stream and maintains a
//! local, continuously-updated view of every non-terminal task in the
//! cluster — including its host/container IPs and published ports, joined
//! in from the separate agent and framework event streams.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mesos_tracker::{Config, client};
//!
//! #[tokio::main]
//! async fn main() -> mesos_tracker::error::Result<()> {
//!     let master = "http://master.mesos:5050/api/v1".parse().unwrap();
//!     let supervisor = client::standalone(master, Config::default());
//!     let handle = supervisor.handle();
//!     tokio::spawn(supervisor.run());
//!
//!     let mut subscription = loop {
//!         match handle.subscribe().await {
//!             Ok(sub) => break sub,
//!             Err(_) => tokio::time::sleep(std::time::Duration::from_millis(100)).await,
//!         }
//!     };
//!
//!     while let Some(event) = subscription.next_update().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod constants;
pub mod diff;
pub mod error;
pub mod model;
pub mod project;
pub mod recordio;
pub mod store;
pub mod subscriber;
pub mod tracker;

pub use client::{Subscription, Supervisor, TrackerHandle, standalone};
pub use config::{Config, MasterResolver, StaticMasterResolver};
pub use error::{Result, SubscribeError, TrackerError};
pub use subscriber::TrackerEvent;
