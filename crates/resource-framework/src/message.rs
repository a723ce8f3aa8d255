//! # Store Messages
//!
//! This module defines the message types used for communication between
//! the `ResourceClient` and `ResourceActor`.

use crate::entity::Resource;
use crate::error::FrameworkError;
use crate::filter::ListQuery;
use crate::permission::CallerId;
use crate::record::{Fields, RecordId};
use crate::schema::Schema;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by actors.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// How an update treats fields missing from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Full replacement (`PUT`): required fields must all be supplied.
    Replace,
    /// Partial update (`PATCH`): missing fields keep their stored values.
    Patch,
}

impl WriteMode {
    /// The stored fields an update is merged onto.
    ///
    /// A replacement keeps only the read-only fields (id, owner); every
    /// writable field comes from the payload or falls back to its default.
    /// A patch keeps everything.
    pub fn base(self, schema: &Schema, stored: Fields) -> Fields {
        match self {
            WriteMode::Replace => stored
                .into_iter()
                .filter(|(name, _)| schema.is_read_only(name))
                .collect(),
            WriteMode::Patch => stored,
        }
    }

    /// What [`validate`](crate::validate::validate) checks required fields against.
    pub fn existing(self, base: &Fields) -> Option<&Fields> {
        match self {
            WriteMode::Replace => None,
            WriteMode::Patch => Some(base),
        }
    }
}

/// Internal message type sent to the actor to request operations.
///
/// The variants map to the store's operations: the CRUD lifecycle plus
/// filtered listing and the bulk removal cascade rules rely on. Every variant
/// uses the associated types of the [`Resource`] it is addressed to, so a
/// product store can only ever answer with products.
#[derive(Debug)]
pub enum ResourceRequest<T: Resource> {
    Create {
        fields: Fields,
        owner: Option<CallerId>,
        respond_to: Response<T>,
    },
    Get {
        id: RecordId,
        respond_to: Response<T>,
    },
    List {
        query: ListQuery,
        respond_to: Response<Vec<T>>,
    },
    Update {
        id: RecordId,
        fields: Fields,
        mode: WriteMode,
        respond_to: Response<T>,
    },
    Delete {
        id: RecordId,
        respond_to: Response<T>,
    },
    /// Removes every record whose reference `field` points at `target`.
    DeleteWhere {
        field: &'static str,
        target: RecordId,
        respond_to: Response<Vec<T>>,
    },
}
