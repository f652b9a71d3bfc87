//! Opaque entity identifiers.
//!
//! Mesos agent, framework, and task identifiers are all just byte strings on
//! the wire. Each gets its own newtype so a `TaskId` can never be handed to a
//! function expecting a `FrameworkId` by accident.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Borrow the identifier's wire value.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

opaque_id!(AgentId, "Identifies a Mesos agent (worker node).");
opaque_id!(FrameworkId, "Identifies a Mesos framework (tenant).");
opaque_id!(TaskId, "Identifies a Mesos task.");
