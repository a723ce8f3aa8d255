//! # Resource Framework
//!
//! Building blocks for serving typed records over a uniform CRUD surface. Each
//! record kind is an explicit struct implementing [`Resource`]; the framework
//! supplies everything else once, for every kind:
//!
//! 1. **Store** ([`ResourceActor`] + [`ResourceClient`]) - one actor per kind owns
//!    the records and processes requests sequentially, so there are no locks and
//!    no interleaved writes.
//! 2. **Validation** ([`validate`](validate::validate)) - schema-driven field
//!    rules that report every failure at once.
//! 3. **Serialization** ([`to_external`], [`from_external`]) - records to
//!    payloads (with `url`, reference handles and computed fields) and back.
//! 4. **Permission Gate** ([`PermissionGate`]) - an explicit [`Policy`] object
//!    consulted before any write.
//! 5. **Handler** ([`ResourceHandler`]) - runs a request through
//!    authorize → decode → validate → persist → render.
//! 6. **Cascades** ([`Cascader`]) - relation rules applied after deletes.
//!
//! The framework knows nothing about HTTP; a transport maps requests onto the
//! handler and [`Rejection`]s onto its own status codes.
//!
//! ## Defining a Kind
//!
//! ```rust
//! use resource_framework::{FieldSpec, RecordId, Resource, ResourceActor, Schema};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//! use std::sync::OnceLock;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Department {
//!     id: RecordId,
//!     name: String,
//! }
//!
//! impl Resource for Department {
//!     const KIND: &'static str = "departments";
//!     type Context = ();
//!
//!     fn schema() -> &'static Schema {
//!         static SCHEMA: OnceLock<Schema> = OnceLock::new();
//!         SCHEMA.get_or_init(|| {
//!             Schema::new("departments")
//!                 .field(FieldSpec::text("name").required().max_length(50).unique())
//!         })
//!     }
//!
//!     fn id(&self) -> RecordId {
//!         self.id
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let (actor, client) = ResourceActor::<Department>::new(10);
//!     tokio::spawn(actor.run(()));
//!
//!     let fields = json!({"name": "Sales"}).as_object().cloned().unwrap();
//!     let created = client.create(fields.clone(), None).await.unwrap();
//!     assert_eq!(created.id, RecordId(1));
//!
//!     // unique field
//!     assert!(client.create(fields, None).await.is_err());
//! }
//! ```
//!
//! ## Context Injection Pattern
//!
//! Dependencies are injected when a store starts (`actor.run(context)`), not
//! when it is constructed. A kind referencing another kind takes that kind's
//! client as its context and checks references in its lifecycle hooks; since
//! every actor exists before any of them runs, stores can be wired in any order.
//!
//! ## Testing
//!
//! [`mock::MockClient`] answers client requests from a queue of expectations,
//! so handler logic can be tested without spawning stores.

pub mod actor;
pub mod cascade;
pub mod client;
pub mod entity;
pub mod error;
pub mod filter;
pub mod handler;
pub mod message;
pub mod mock;
pub mod permission;
pub mod record;
pub mod schema;
pub mod serialize;
pub mod tracing;
pub mod validate;

// Re-export core types for convenience
pub use actor::ResourceActor;
pub use cascade::{Cascade, Cascader, Collection, Relation};
pub use client::ResourceClient;
pub use entity::Resource;
pub use error::FrameworkError;
pub use filter::ListQuery;
pub use handler::{Rejection, ResourceHandler, Stage};
pub use message::{ResourceRequest, Response, WriteMode};
pub use permission::{
    Caller, CallerId, Decision, Operation, OwnershipPolicy, PermissionGate, Policy, Target,
};
pub use record::{Fields, RecordId};
pub use schema::{FieldSpec, FieldType, Rule, Schema};
pub use serialize::{from_external, to_external, Payload};
pub use validate::{FieldError, ValidationErrors};
