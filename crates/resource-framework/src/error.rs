//! # Framework Errors
//!
//! Errors produced by the entity store and the channel plumbing around it.
//! The request-facing taxonomy built on top of these lives in
//! [`handler::Rejection`](crate::handler::Rejection).

use crate::record::RecordId;
use crate::validate::ValidationErrors;

/// Errors that can occur within the store actors and their clients.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Item not found: {kind}/{id}")]
    NotFound { kind: &'static str, id: RecordId },
    #[error("{kind} with this {field} already exists")]
    Duplicate {
        kind: &'static str,
        field: &'static str,
    },
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error("Record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
