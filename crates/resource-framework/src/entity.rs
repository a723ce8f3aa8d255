//! # Resource Trait
//!
//! The `Resource` trait is the contract every record kind (products, employees,
//! questions, …) implements to be managed by the generic
//! [`ResourceActor`](crate::ResourceActor). The store, the serializer and the
//! handler are written once against this trait and reused for every kind.
//!
//! A kind is an explicit struct with a declared [`Schema`]; there are no open
//! attribute bags. The store moves data as [`Fields`] maps between layers and
//! only ever holds fully materialized, validated structs.
//!
//! # Provided Methods (Hooks)
//! All hooks have defaults that do nothing:
//! - [`Resource::prepare`] fills derived defaults before validation
//! - [`Resource::check`] holds cross-field invariants
//! - [`Resource::computed`] adds output-only fields
//! - [`Resource::related`] / [`Resource::brief`] render sibling records
//! - [`Resource::on_create`] / [`Resource::on_update`] / [`Resource::on_delete`]
//!   run inside the store actor with the injected context

use crate::error::FrameworkError;
use crate::filter::ListQuery;
use crate::permission::CallerId;
use crate::record::{Fields, RecordId};
use crate::schema::Schema;
use crate::serialize::{reference_handle, Payload};
use crate::validate::ValidationErrors;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Trait that any record kind must implement to be managed by `ResourceActor`.
///
/// # Async & Context
/// The lifecycle hooks are async and receive a `Context`, injected when the
/// actor is started (`actor.run(context)`). A kind whose records reference
/// another kind typically takes that kind's client as its context and checks
/// the reference in `on_create`/`on_update`.
#[async_trait]
pub trait Resource: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Collection name, used in paths, logs and error messages.
    const KIND: &'static str;

    /// Runtime dependencies injected into the actor. Use `()` if none.
    type Context: Send + Sync;

    /// The field declarations of this kind.
    fn schema() -> &'static Schema;

    fn id(&self) -> RecordId;

    /// The caller that owns this record, for kinds with an owner field.
    fn owner(&self) -> Option<&CallerId> {
        None
    }

    /// Fills derived defaults into incoming fields before validation.
    ///
    /// `existing` is `None` on create. On updates it holds the stored fields
    /// the write is merged onto: everything for a patch, only the read-only
    /// fields for a full replacement.
    fn prepare(_fields: &mut Fields, _existing: Option<&Fields>) {}

    /// Cross-field invariants, checked after every per-field rule passed.
    fn check(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }

    /// Output-only fields added to the external representation.
    fn computed(&self) -> Fields {
        Fields::new()
    }

    /// Other records of the same kind rendered alongside this one, as the
    /// output field name and the query selecting them.
    fn related(&self) -> Option<(&'static str, ListQuery)> {
        None
    }

    /// Short form of a record inside another record's related listing.
    fn brief(&self) -> Payload {
        reference_handle(Self::KIND, self.id())
    }

    // --- Lifecycle Hooks (Async) ---

    /// Called on the validated candidate, right before it is inserted.
    async fn on_create(&mut self, _ctx: &Self::Context) -> Result<(), FrameworkError> {
        Ok(())
    }

    /// Called on the validated candidate, right before it replaces the stored record.
    async fn on_update(&mut self, _ctx: &Self::Context) -> Result<(), FrameworkError> {
        Ok(())
    }

    /// Called immediately before the record is removed.
    async fn on_delete(&self, _ctx: &Self::Context) -> Result<(), FrameworkError> {
        Ok(())
    }
}
