//! # Permission Gate
//!
//! Decides whether a caller may perform an operation on a record. The gate
//! holds an explicit [`Policy`] object; swapping the policy changes the rules
//! for every kind served through it.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use tracing::debug;

/// Opaque principal identifier (a username).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(pub String);

impl From<&str> for CallerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Display for CallerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The authenticated principal making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: CallerId,
    /// Staff callers bypass ownership checks.
    pub elevated: bool,
}

impl Caller {
    pub fn ordinary(id: impl Into<String>) -> Self {
        Self {
            id: CallerId(id.into()),
            elevated: false,
        }
    }

    pub fn elevated(id: impl Into<String>) -> Self {
        Self {
            id: CallerId(id.into()),
            elevated: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Operation::Create | Operation::Update | Operation::Delete
        )
    }
}

/// What the gate knows about the record an operation targets.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub kind: &'static str,
    /// Whether the kind has an owner field at all.
    pub ownable: bool,
    /// Owner of the targeted record (`None` for collection-level operations).
    pub owner: Option<&'a CallerId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
pub const NOT_PERMITTED: &str = "You do not have permission to perform this action.";

/// An authorization policy.
pub trait Policy: Send + Sync {
    fn authorize(&self, caller: Option<&Caller>, op: Operation, target: &Target<'_>) -> Decision;
}

/// Elevated callers pass unconditionally; everyone may read; ordinary callers
/// may create records of ownable kinds and modify only the records they own.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipPolicy;

impl Policy for OwnershipPolicy {
    fn authorize(&self, caller: Option<&Caller>, op: Operation, target: &Target<'_>) -> Decision {
        if !op.is_write() {
            return Decision::Allow;
        }
        let Some(caller) = caller else {
            return Decision::Deny(NOT_AUTHENTICATED.to_string());
        };
        if caller.elevated {
            return Decision::Allow;
        }
        let allowed = match op {
            Operation::Create => target.ownable,
            _ => target.ownable && target.owner == Some(&caller.id),
        };
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny(NOT_PERMITTED.to_string())
        }
    }
}

/// Returned when the gate denies an operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PermissionDenied(pub String);

/// Shared, cloneable gate around a policy.
#[derive(Clone)]
pub struct PermissionGate {
    policy: Arc<dyn Policy>,
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new(OwnershipPolicy)
    }
}

impl PermissionGate {
    pub fn new(policy: impl Policy + 'static) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    pub fn authorize(
        &self,
        caller: Option<&Caller>,
        op: Operation,
        target: &Target<'_>,
    ) -> Result<(), PermissionDenied> {
        match self.policy.authorize(caller, op, target) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                debug!(
                    caller = caller.map(|c| c.id.0.as_str()).unwrap_or("anonymous"),
                    ?op,
                    kind = target.kind,
                    "Denied"
                );
                Err(PermissionDenied(reason))
            }
        }
    }
}
