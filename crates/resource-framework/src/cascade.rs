//! # Cascade Rules
//!
//! Relations between record kinds and what deleting one side does to the
//! other. Rules run after the triggering delete has committed, from the
//! handler's task rather than inside a store actor, so a store never waits on
//! another store that might be waiting on it.
//!
//! ```text
//! DELETE /questions/1
//!   └─► choices where question = 1   (DeleteChildren)
//!   └─► marks   where question = 1   (DeleteChildren)
//!
//! DELETE /choices/7   (last choice of question 1)
//!   └─► questions/1                  (DeleteChildlessParent)
//! ```
//!
//! Rules apply transitively: records removed by a rule trigger the rules of
//! their own kind. A record that is already gone when a rule reaches it is
//! skipped.

use crate::client::ResourceClient;
use crate::entity::Resource;
use crate::error::FrameworkError;
use crate::filter::ListQuery;
use crate::record::{to_fields, Fields, RecordId};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// What happens across a relation when one side is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cascade {
    /// Deleting the parent deletes every child referencing it.
    DeleteChildren,
    /// Deleting a child deletes its parent once no other child references it.
    DeleteChildlessParent,
}

/// A reference from `child.field` to `parent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub child: &'static str,
    pub field: &'static str,
    pub parent: &'static str,
    pub rules: Vec<Cascade>,
}

impl Relation {
    pub fn new(child: &'static str, field: &'static str, parent: &'static str) -> Self {
        Self {
            child,
            field,
            parent,
            rules: Vec::new(),
        }
    }

    pub fn with(mut self, rule: Cascade) -> Self {
        self.rules.push(rule);
        self
    }

    fn has(&self, rule: Cascade) -> bool {
        self.rules.contains(&rule)
    }
}

/// Kind-erased access to one store, as needed by cascade rules.
#[async_trait]
pub trait Collection: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Removes one record; `None` if it no longer exists.
    async fn remove(&self, id: RecordId) -> Result<Option<Fields>, FrameworkError>;

    /// Removes every record whose `field` references `target`.
    async fn remove_where(
        &self,
        field: &'static str,
        target: RecordId,
    ) -> Result<Vec<Fields>, FrameworkError>;

    async fn count_where(&self, field: &'static str, target: RecordId) -> Result<usize, FrameworkError>;
}

#[async_trait]
impl<T: Resource> Collection for ResourceClient<T> {
    fn kind(&self) -> &'static str {
        T::KIND
    }

    async fn remove(&self, id: RecordId) -> Result<Option<Fields>, FrameworkError> {
        match self.delete(id).await {
            Ok(record) => Ok(Some(to_fields(&record)?)),
            Err(FrameworkError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn remove_where(
        &self,
        field: &'static str,
        target: RecordId,
    ) -> Result<Vec<Fields>, FrameworkError> {
        let removed = self.delete_where(field, target).await?;
        removed
            .iter()
            .map(|r| to_fields(r).map_err(FrameworkError::from))
            .collect()
    }

    async fn count_where(&self, field: &'static str, target: RecordId) -> Result<usize, FrameworkError> {
        let query = ListQuery::new().filter(field, target.0);
        Ok(self.list(query).await?.len())
    }
}

/// Applies the declared relations after deletes.
#[derive(Default)]
pub struct Cascader {
    collections: HashMap<&'static str, Arc<dyn Collection>>,
    relations: Vec<Relation>,
}

impl Cascader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a store reachable by kind.
    pub fn register(mut self, collection: impl Collection + 'static) -> Self {
        self.collections
            .insert(collection.kind(), Arc::new(collection));
        self
    }

    pub fn relate(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    fn collection(&self, kind: &'static str) -> Option<&Arc<dyn Collection>> {
        let collection = self.collections.get(kind);
        if collection.is_none() {
            debug!(entity_type = kind, "No store registered for cascade");
        }
        collection
    }

    /// Runs every rule triggered by the removal of `removed` (a record of
    /// `kind`), and the rules triggered by what those remove in turn.
    pub async fn after_delete(&self, kind: &'static str, removed: Fields) -> Result<(), FrameworkError> {
        let mut pending = VecDeque::from([(kind, removed)]);

        while let Some((kind, fields)) = pending.pop_front() {
            let Some(id) = fields.get("id").and_then(RecordId::from_value) else {
                continue;
            };

            for relation in &self.relations {
                if relation.parent == kind && relation.has(Cascade::DeleteChildren) {
                    if let Some(children) = self.collection(relation.child) {
                        let removed = children.remove_where(relation.field, id).await?;
                        if !removed.is_empty() {
                            info!(entity_type = relation.child, parent = kind, %id, removed = removed.len(), "Cascade deleted children");
                        }
                        pending.extend(removed.into_iter().map(|f| (relation.child, f)));
                    }
                }

                if relation.child == kind && relation.has(Cascade::DeleteChildlessParent) {
                    let Some(parent_id) = fields.get(relation.field).and_then(RecordId::from_value)
                    else {
                        continue;
                    };
                    let (Some(children), Some(parents)) =
                        (self.collection(relation.child), self.collection(relation.parent))
                    else {
                        continue;
                    };
                    if children.count_where(relation.field, parent_id).await? > 0 {
                        continue;
                    }
                    if let Some(parent) = parents.remove(parent_id).await? {
                        info!(entity_type = relation.parent, id = %parent_id, "Cascade deleted childless parent");
                        pending.push_back((relation.parent, parent));
                    }
                }
            }
        }
        Ok(())
    }
}
