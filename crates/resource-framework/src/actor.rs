//! # Entity Store
//!
//! This module defines the `ResourceActor`, the component that owns the
//! records of one kind. It implements the "Server" side of the Actor Model,
//! processing messages sequentially and ensuring exclusive access to the
//! record map.

use crate::client::ResourceClient;
use crate::entity::Resource;
use crate::error::FrameworkError;
use crate::filter::values_equal;
use crate::message::{ResourceRequest, WriteMode};
use crate::permission::CallerId;
use crate::record::{to_fields, Fields, RecordId};
use crate::schema::Uniqueness;
use crate::validate::validate;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The generic store actor that manages all records of one kind.
///
/// # Concurrency Model
/// The actor processes its messages one at a time in a loop, so two requests
/// touching the same record never interleave: validation, the uniqueness check
/// and the write of one request complete before the next request is looked
/// at. Concurrent updates of one record therefore resolve as
/// last-committed-write-wins, with no `Mutex` around the map.
///
/// # Usage Pattern
///
/// 1.  **Create**: `ResourceActor::new()` returns the actor (server) and a client.
/// 2.  **Wire**: pass dependencies (other clients) into `actor.run(context)`.
/// 3.  **Run**: spawn the run loop in a background task.
///
/// # Operations
///
/// * **Create**: prepares defaults, validates, builds the candidate with the
///   next id (and the owner), runs the cross-field check, the uniqueness check
///   and `on_create`, then inserts. The id is consumed only on success.
/// * **Get**: clone of the record, or `NotFound`.
/// * **List**: filtered, searched, sorted and windowed clones.
/// * **Update**: validates the incoming fields against the stored ones,
///   merges, re-checks, runs `on_update` and replaces the record.
/// * **Delete**: runs `on_delete` and removes the record, returning it.
/// * **DeleteWhere**: removes every record referencing a given target.
pub struct ResourceActor<T: Resource> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    // ids grow monotonically, so key order is insertion order
    records: BTreeMap<RecordId, T>,
    next_id: u32,
}

impl<T: Resource> ResourceActor<T> {
    /// Creates a new `ResourceActor` and its associated `ResourceClient`.
    ///
    /// `buffer_size` is the capacity of the channel; when it is full, client
    /// calls wait until there is space.
    pub fn new(buffer_size: usize) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            records: BTreeMap::new(),
            next_id: 1,
        };
        (actor, ResourceClient::new(sender))
    }

    /// Runs the actor's event loop until every client has been dropped.
    ///
    /// # Context Injection
    /// `context` is handed to every lifecycle hook. It is supplied here rather
    /// than in `new()` so actors can be wired to each other's clients after
    /// all of them exist.
    pub async fn run(mut self, context: T::Context) {
        let entity_type = T::KIND;
        info!(entity_type, "Store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create {
                    fields,
                    owner,
                    respond_to,
                } => {
                    debug!(entity_type, ?fields, "Create");
                    let result = self.create(fields, owner, &context).await;
                    match &result {
                        Ok(record) => {
                            info!(entity_type, id = %record.id(), size = self.records.len(), "Created")
                        }
                        Err(e) => warn!(entity_type, error = %e, "Create failed"),
                    }
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Get { id, respond_to } => {
                    let result = self.records.get(&id).cloned().ok_or(FrameworkError::NotFound {
                        kind: entity_type,
                        id,
                    });
                    debug!(entity_type, %id, found = result.is_ok(), "Get");
                    let _ = respond_to.send(result);
                }
                ResourceRequest::List { query, respond_to } => {
                    let result = query
                        .select(T::schema(), self.records.values())
                        .map_err(FrameworkError::from);
                    debug!(entity_type, ?query, "List");
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Update {
                    id,
                    fields,
                    mode,
                    respond_to,
                } => {
                    debug!(entity_type, %id, ?fields, ?mode, "Update");
                    let result = self.update(id, fields, mode, &context).await;
                    match &result {
                        Ok(_) => info!(entity_type, %id, "Updated"),
                        Err(e) => warn!(entity_type, %id, error = %e, "Update failed"),
                    }
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Delete { id, respond_to } => {
                    debug!(entity_type, %id, "Delete");
                    let result = self.delete(id, &context).await;
                    match &result {
                        Ok(_) => info!(entity_type, %id, size = self.records.len(), "Deleted"),
                        Err(e) => warn!(entity_type, %id, error = %e, "Delete failed"),
                    }
                    let _ = respond_to.send(result);
                }
                ResourceRequest::DeleteWhere {
                    field,
                    target,
                    respond_to,
                } => {
                    let result = self.delete_where(field, target, &context).await;
                    if let Ok(removed) = &result {
                        info!(entity_type, field, %target, removed = removed.len(), "Deleted referencing records");
                    }
                    let _ = respond_to.send(result);
                }
            }
        }

        info!(entity_type, size = self.records.len(), "Shutdown");
    }

    async fn create(
        &mut self,
        mut fields: Fields,
        owner: Option<CallerId>,
        context: &T::Context,
    ) -> Result<T, FrameworkError> {
        let schema = T::schema();
        T::prepare(&mut fields, None);
        validate(schema, &fields, None)?;
        // absent and null both fall back to the kind's serde defaults
        fields.retain(|_, value| !value.is_null());

        let id = RecordId(self.next_id);
        fields.insert("id".to_string(), Value::from(id.0));
        if let (Some(owner_field), Some(owner)) = (schema.owner_field(), owner) {
            fields.insert(owner_field.to_string(), Value::String(owner.0));
        }

        let mut record: T = serde_json::from_value(Value::Object(fields))?;
        record.check()?;
        self.ensure_unique(&record)?;
        record.on_create(context).await?;

        self.next_id += 1;
        self.records.insert(id, record.clone());
        Ok(record)
    }

    async fn update(
        &mut self,
        id: RecordId,
        mut fields: Fields,
        mode: WriteMode,
        context: &T::Context,
    ) -> Result<T, FrameworkError> {
        let current = self
            .records
            .get(&id)
            .ok_or(FrameworkError::NotFound { kind: T::KIND, id })?;
        let schema = T::schema();
        let base = mode.base(schema, to_fields(current)?);

        T::prepare(&mut fields, Some(&base));
        validate(schema, &fields, mode.existing(&base))?;

        let mut merged = base.clone();
        merged.extend(fields);
        merged.retain(|_, value| !value.is_null());
        let mut record: T = serde_json::from_value(Value::Object(merged))?;
        record.check()?;
        self.ensure_unique(&record)?;
        record.on_update(context).await?;

        self.records.insert(id, record.clone());
        Ok(record)
    }

    async fn delete(&mut self, id: RecordId, context: &T::Context) -> Result<T, FrameworkError> {
        let record = self
            .records
            .get(&id)
            .ok_or(FrameworkError::NotFound { kind: T::KIND, id })?;
        record.on_delete(context).await?;
        self.records
            .remove(&id)
            .ok_or(FrameworkError::NotFound { kind: T::KIND, id })
    }

    async fn delete_where(
        &mut self,
        field: &'static str,
        target: RecordId,
        context: &T::Context,
    ) -> Result<Vec<T>, FrameworkError> {
        let mut matching = Vec::new();
        for (id, record) in &self.records {
            let fields = to_fields(record)?;
            if fields.get(field).and_then(RecordId::from_value) == Some(target) {
                matching.push(*id);
            }
        }

        let mut removed = Vec::with_capacity(matching.len());
        for id in matching {
            removed.push(self.delete(id, context).await?);
        }
        Ok(removed)
    }

    /// Fails with `Duplicate` if another record holds the same value in a unique field.
    fn ensure_unique(&self, candidate: &T) -> Result<(), FrameworkError> {
        let schema = T::schema();
        let unique: Vec<_> = schema
            .fields()
            .filter_map(|f| f.unique.map(|u| (f.name, u)))
            .collect();
        if unique.is_empty() {
            return Ok(());
        }

        let fields = to_fields(candidate)?;
        for other in self.records.values().filter(|r| r.id() != candidate.id()) {
            let other_fields = to_fields(other)?;
            for (name, uniqueness) in &unique {
                let (Some(mine), Some(theirs)) = (fields.get(*name), other_fields.get(*name)) else {
                    continue;
                };
                if mine.is_null() {
                    continue;
                }
                let collides = match (uniqueness, mine, theirs) {
                    (Uniqueness::CaseInsensitive, Value::String(a), Value::String(b)) => {
                        a.to_lowercase() == b.to_lowercase()
                    }
                    _ => values_equal(mine, theirs),
                };
                if collides {
                    return Err(FrameworkError::Duplicate {
                        kind: T::KIND,
                        field: *name,
                    });
                }
            }
        }
        Ok(())
    }
}
