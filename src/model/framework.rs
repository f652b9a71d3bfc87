//! Framework entity.

use serde::{Deserialize, Serialize};

use super::ids::FrameworkId;

/// A known Mesos framework (tenant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framework {
    pub id: FrameworkId,
    pub name: Option<String>,
}
