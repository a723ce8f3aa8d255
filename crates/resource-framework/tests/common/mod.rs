//! Record kinds shared by the integration tests: topics, and notes that
//! reference a topic and belong to the caller who wrote them.

#![allow(dead_code)]

use async_trait::async_trait;
use resource_framework::{
    CallerId, FieldSpec, Fields, FrameworkError, RecordId, Resource, ResourceActor, ResourceClient,
    Schema, ValidationErrors,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: RecordId,
    pub name: String,
}

impl Resource for Topic {
    const KIND: &'static str = "topics";
    type Context = ();

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new("topics").field(
                FieldSpec::text("name")
                    .required()
                    .max_length(20)
                    .unique_case_insensitive()
                    .indexed(),
            )
        })
    }

    fn id(&self) -> RecordId {
        self.id
    }
}

fn default_priority() -> i64 {
    1
}

fn default_max_priority() -> i64 {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: RecordId,
    pub topic: RecordId,
    pub body: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default = "default_max_priority")]
    pub max_priority: i64,
    #[serde(default)]
    pub owner: Option<CallerId>,
}

#[async_trait]
impl Resource for Note {
    const KIND: &'static str = "notes";
    type Context = ResourceClient<Topic>;

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new("notes")
                .field(FieldSpec::reference("topic", "topics").required())
                .field(FieldSpec::text("body").required().max_length(100).searchable())
                .field(FieldSpec::text("summary"))
                .field(FieldSpec::integer("priority").min(0.0))
                .field(FieldSpec::integer("max_priority").min(1.0))
                .owned_by("owner")
                .computed("urgent")
        })
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn owner(&self) -> Option<&CallerId> {
        self.owner.as_ref()
    }

    fn prepare(fields: &mut Fields, existing: Option<&Fields>) {
        let kept = existing.is_some_and(|current| current.contains_key("summary"));
        if !kept && !fields.contains_key("summary") {
            if let Some(body) = fields.get("body").cloned() {
                fields.insert("summary".to_string(), body);
            }
        }
    }

    fn check(&self) -> Result<(), ValidationErrors> {
        if self.priority > self.max_priority {
            return Err(ValidationErrors::single(
                "priority",
                "Priority cannot exceed max_priority.",
            ));
        }
        Ok(())
    }

    fn computed(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("urgent".to_string(), Value::Bool(self.priority >= 4));
        fields
    }

    async fn on_create(&mut self, topics: &ResourceClient<Topic>) -> Result<(), FrameworkError> {
        topics.ensure_exists("topic", self.topic).await
    }

    async fn on_update(&mut self, topics: &ResourceClient<Topic>) -> Result<(), FrameworkError> {
        topics.ensure_exists("topic", self.topic).await
    }
}

#[allow(dead_code)]
pub fn fields(value: Value) -> Fields {
    value.as_object().cloned().expect("test fields must be an object")
}

/// Spawns both stores, wiring the topic client into the note store.
pub fn start_stores() -> (ResourceClient<Topic>, ResourceClient<Note>) {
    let (topic_actor, topics) = ResourceActor::<Topic>::new(10);
    let (note_actor, notes) = ResourceActor::<Note>::new(10);
    tokio::spawn(topic_actor.run(()));
    tokio::spawn(note_actor.run(topics.clone()));
    (topics, notes)
}
