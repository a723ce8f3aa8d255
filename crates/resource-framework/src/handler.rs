//! # Resource Handler
//!
//! Orchestrates one request against one record kind:
//!
//! ```text
//! Received ─► Authorized ─► Validated ─► Persisted ─► Responded
//!     └──────────┴─────────────┴────────────┴──► Rejected(kind)
//! ```
//!
//! Update and delete fetch the target record first so the permission gate can
//! see its owner; a caller that may not touch the record is rejected before
//! its payload is even decoded. Nothing is written unless every earlier stage
//! passed.
//!
//! Validation reports type errors and field-rule failures in one set. A kind
//! with [`related`](Resource::related) records gets them listed in every
//! payload it renders.

use crate::cascade::Cascader;
use crate::client::ResourceClient;
use crate::entity::Resource;
use crate::error::FrameworkError;
use crate::filter::ListQuery;
use crate::message::WriteMode;
use crate::permission::{Caller, CallerId, Operation, PermissionDenied, PermissionGate, Target};
use crate::record::{to_fields, Fields, RecordId};
use crate::serialize::{decode_partial, to_external, Payload};
use crate::validate::{validate, ValidationErrors};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Where a request currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Authorized,
    Validated,
    Persisted,
    Responded,
}

/// Why a request was turned down.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error(transparent)]
    Validation(ValidationErrors),
    #[error("Not found: {kind}/{id}")]
    NotFound { kind: &'static str, id: RecordId },
    /// Anonymous caller attempting something that needs an identity.
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Permission(String),
    #[error("{kind} with this {field} already exists.")]
    Duplicate {
        kind: &'static str,
        field: &'static str,
    },
    #[error("Store unavailable")]
    Unavailable,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<FrameworkError> for Rejection {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::ActorClosed | FrameworkError::ActorDropped => Rejection::Unavailable,
            FrameworkError::NotFound { kind, id } => Rejection::NotFound { kind, id },
            FrameworkError::Duplicate { kind, field } => Rejection::Duplicate { kind, field },
            FrameworkError::Invalid(errors) => Rejection::Validation(errors),
            FrameworkError::Encoding(e) => Rejection::Internal(e.to_string()),
        }
    }
}

impl From<ValidationErrors> for Rejection {
    fn from(errors: ValidationErrors) -> Self {
        Rejection::Validation(errors)
    }
}

impl From<serde_json::Error> for Rejection {
    fn from(e: serde_json::Error) -> Self {
        Rejection::Internal(e.to_string())
    }
}

/// Stage bookkeeping for one request.
struct Progress {
    kind: &'static str,
    operation: Operation,
    stage: Stage,
}

impl Progress {
    fn start(kind: &'static str, operation: Operation) -> Self {
        debug!(entity_type = kind, ?operation, stage = ?Stage::Received, "Stage");
        Self {
            kind,
            operation,
            stage: Stage::Received,
        }
    }

    fn advance(&mut self, stage: Stage) {
        self.stage = stage;
        debug!(entity_type = self.kind, operation = ?self.operation, stage = ?stage, "Stage");
    }

    fn reject(&self, rejection: Rejection) -> Rejection {
        match &rejection {
            Rejection::Unavailable | Rejection::Internal(_) => {
                warn!(entity_type = self.kind, operation = ?self.operation, stage = ?self.stage, error = %rejection, "Rejected")
            }
            _ => {
                debug!(entity_type = self.kind, operation = ?self.operation, stage = ?self.stage, error = %rejection, "Rejected")
            }
        }
        rejection
    }
}

/// Generic request handler for one record kind.
pub struct ResourceHandler<T: Resource> {
    store: ResourceClient<T>,
    gate: PermissionGate,
    cascade: Option<Arc<Cascader>>,
}

impl<T: Resource> Clone for ResourceHandler<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gate: self.gate.clone(),
            cascade: self.cascade.clone(),
        }
    }
}

impl<T: Resource> ResourceHandler<T> {
    pub fn new(store: ResourceClient<T>, gate: PermissionGate) -> Self {
        Self {
            store,
            gate,
            cascade: None,
        }
    }

    /// Runs `cascader` after every successful delete.
    pub fn with_cascade(mut self, cascader: Arc<Cascader>) -> Self {
        self.cascade = Some(cascader);
        self
    }

    pub fn kind(&self) -> &'static str {
        T::KIND
    }

    #[instrument(skip(self, caller), fields(entity_type = T::KIND))]
    pub async fn list(
        &self,
        caller: Option<&Caller>,
        params: &HashMap<String, String>,
    ) -> Result<Vec<Payload>, Rejection> {
        let mut progress = Progress::start(T::KIND, Operation::List);
        self.run_list(&mut progress, caller, params)
            .await
            .map_err(|r| progress.reject(r))
    }

    #[instrument(skip(self, caller), fields(entity_type = T::KIND))]
    pub async fn retrieve(&self, caller: Option<&Caller>, id: RecordId) -> Result<Payload, Rejection> {
        let mut progress = Progress::start(T::KIND, Operation::Retrieve);
        self.run_retrieve(&mut progress, caller, id)
            .await
            .map_err(|r| progress.reject(r))
    }

    #[instrument(skip(self, caller, payload), fields(entity_type = T::KIND))]
    pub async fn create(&self, caller: Option<&Caller>, payload: &Payload) -> Result<Payload, Rejection> {
        let mut progress = Progress::start(T::KIND, Operation::Create);
        self.run_create(&mut progress, caller, payload)
            .await
            .map_err(|r| progress.reject(r))
    }

    /// Full replacement of the writable fields (`PUT`).
    #[instrument(skip(self, caller, payload), fields(entity_type = T::KIND))]
    pub async fn replace(
        &self,
        caller: Option<&Caller>,
        id: RecordId,
        payload: &Payload,
    ) -> Result<Payload, Rejection> {
        let mut progress = Progress::start(T::KIND, Operation::Update);
        self.run_update(&mut progress, caller, id, payload, WriteMode::Replace)
            .await
            .map_err(|r| progress.reject(r))
    }

    /// Partial update (`PATCH`).
    #[instrument(skip(self, caller, payload), fields(entity_type = T::KIND))]
    pub async fn patch(
        &self,
        caller: Option<&Caller>,
        id: RecordId,
        payload: &Payload,
    ) -> Result<Payload, Rejection> {
        let mut progress = Progress::start(T::KIND, Operation::Update);
        self.run_update(&mut progress, caller, id, payload, WriteMode::Patch)
            .await
            .map_err(|r| progress.reject(r))
    }

    #[instrument(skip(self, caller), fields(entity_type = T::KIND))]
    pub async fn delete(&self, caller: Option<&Caller>, id: RecordId) -> Result<(), Rejection> {
        let mut progress = Progress::start(T::KIND, Operation::Delete);
        self.run_delete(&mut progress, caller, id)
            .await
            .map_err(|r| progress.reject(r))
    }

    async fn run_list(
        &self,
        progress: &mut Progress,
        caller: Option<&Caller>,
        params: &HashMap<String, String>,
    ) -> Result<Vec<Payload>, Rejection> {
        self.authorize(caller, Operation::List, None)?;
        progress.advance(Stage::Authorized);

        let query = ListQuery::from_params(T::schema(), params)?;
        progress.advance(Stage::Validated);

        let records = self.store.list(query).await?;
        progress.advance(Stage::Persisted);

        let mut payloads = Vec::with_capacity(records.len());
        for record in &records {
            payloads.push(self.render(record).await?);
        }
        progress.advance(Stage::Responded);
        Ok(payloads)
    }

    async fn run_retrieve(
        &self,
        progress: &mut Progress,
        caller: Option<&Caller>,
        id: RecordId,
    ) -> Result<Payload, Rejection> {
        let record = self.store.get(id).await?;
        self.authorize(caller, Operation::Retrieve, record.owner())?;
        progress.advance(Stage::Authorized);

        let payload = self.render(&record).await?;
        progress.advance(Stage::Responded);
        Ok(payload)
    }

    async fn run_create(
        &self,
        progress: &mut Progress,
        caller: Option<&Caller>,
        payload: &Payload,
    ) -> Result<Payload, Rejection> {
        self.authorize(caller, Operation::Create, None)?;
        progress.advance(Stage::Authorized);

        let fields = Self::decode(payload, None, None)?;
        progress.advance(Stage::Validated);

        let owner = caller.map(|c| c.id.clone());
        let record = self.store.create(fields, owner).await?;
        progress.advance(Stage::Persisted);
        info!(entity_type = T::KIND, id = %record.id(), "Created");

        let payload = self.render(&record).await?;
        progress.advance(Stage::Responded);
        Ok(payload)
    }

    async fn run_update(
        &self,
        progress: &mut Progress,
        caller: Option<&Caller>,
        id: RecordId,
        payload: &Payload,
        mode: WriteMode,
    ) -> Result<Payload, Rejection> {
        let current = self.store.get(id).await?;
        self.authorize(caller, Operation::Update, current.owner())?;
        progress.advance(Stage::Authorized);

        let base = mode.base(T::schema(), to_fields(&current)?);
        let fields = Self::decode(payload, Some(&base), mode.existing(&base))?;
        progress.advance(Stage::Validated);

        let record = self.store.update(id, fields, mode).await?;
        progress.advance(Stage::Persisted);
        info!(entity_type = T::KIND, %id, ?mode, "Updated");

        let payload = self.render(&record).await?;
        progress.advance(Stage::Responded);
        Ok(payload)
    }

    async fn run_delete(
        &self,
        progress: &mut Progress,
        caller: Option<&Caller>,
        id: RecordId,
    ) -> Result<(), Rejection> {
        let current = self.store.get(id).await?;
        self.authorize(caller, Operation::Delete, current.owner())?;
        progress.advance(Stage::Authorized);

        let removed = self.store.delete(id).await?;
        progress.advance(Stage::Persisted);
        info!(entity_type = T::KIND, %id, "Deleted");

        if let Some(cascade) = &self.cascade {
            cascade.after_delete(T::KIND, to_fields(&removed)?).await?;
        }
        progress.advance(Stage::Responded);
        Ok(())
    }

    /// Decodes `payload` and runs the field rules over whatever decoded
    /// cleanly, so type errors and rule failures come back in one response.
    /// The store repeats the rule checks on the fields it is sent.
    fn decode(
        payload: &Payload,
        base: Option<&Fields>,
        existing: Option<&Fields>,
    ) -> Result<Fields, Rejection> {
        let schema = T::schema();
        let (fields, mut errors) = decode_partial(schema, payload)?;

        let mut prepared = fields.clone();
        T::prepare(&mut prepared, base);
        if let Err(rule_errors) = validate(schema, &prepared, existing) {
            errors.absorb(rule_errors);
        }
        errors.into_result()?;
        Ok(fields)
    }

    /// The external payload of `record`, with its related records if it has any.
    async fn render(&self, record: &T) -> Result<Payload, Rejection> {
        let mut payload = to_external(record)?;
        if let Some((field, query)) = record.related() {
            let related = self.store.list(query).await?;
            if let Value::Object(fields) = &mut payload {
                fields.insert(
                    field.to_string(),
                    Value::Array(related.iter().map(T::brief).collect()),
                );
            }
        }
        Ok(payload)
    }

    fn authorize(
        &self,
        caller: Option<&Caller>,
        operation: Operation,
        owner: Option<&CallerId>,
    ) -> Result<(), Rejection> {
        let target = Target {
            kind: T::KIND,
            ownable: T::schema().is_ownable(),
            owner,
        };
        self.gate
            .authorize(caller, operation, &target)
            .map_err(|PermissionDenied(reason)| match caller {
                None => Rejection::Unauthenticated(reason),
                Some(_) => Rejection::Permission(reason),
            })
    }
}
