//! Domain types for the cluster-state tracker.
//!
//! ## Organization
//!
//! - [`ids`] — opaque identifier newtypes (`AgentId`, `FrameworkId`, `TaskId`)
//! - [`agent`] — the `Agent` entity and hostname→IPv4 derivation
//! - [`framework`] — the `Framework` entity
//! - [`port`] — `TaskPort`, protocol, and VIP scope types
//! - [`task`] — the canonical `Task` record, `Ref` unresolved-reference tag,
//!   and `TaskState`
//! - [`wire`] — raw (optional-everything) JSON shapes matching the Mesos
//!   Operator API, used only as the projector's input

pub mod agent;
pub mod framework;
pub mod ids;
pub mod port;
pub mod task;
pub mod wire;

pub use agent::Agent;
pub use framework::Framework;
pub use ids::{AgentId, FrameworkId, TaskId};
pub use port::{Protocol, TaskPort, Vip};
pub use task::{AgentRef, FrameworkRef, Ref, Task, TaskState};
