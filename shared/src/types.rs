//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Role of the person performing an operation
///
/// Authentication happens upstream; the core only needs the role to apply
/// the initial-status policy for new work activities.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Worker,
    Supervisor,
    Admin,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Worker => "worker",
            ActorRole::Supervisor => "supervisor",
            ActorRole::Admin => "admin",
        }
    }

    /// Whether this role may record activities as already approved
    pub fn can_approve(&self) -> bool {
        matches!(self, ActorRole::Supervisor | ActorRole::Admin)
    }
}
