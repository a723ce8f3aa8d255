use crate::model::Question;
use async_trait::async_trait;
use resource_framework::{FieldSpec, FrameworkError, RecordId, Resource, ResourceClient, Schema};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// One answer to a poll question, with its vote count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: RecordId,
    pub question: RecordId,
    pub choice_text: String,
    #[serde(default)]
    pub votes: i64,
}

#[async_trait]
impl Resource for Choice {
    const KIND: &'static str = "choices";
    type Context = ResourceClient<Question>;

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(Self::KIND)
                .field(FieldSpec::reference("question", Question::KIND).required())
                .field(
                    FieldSpec::text("choice_text")
                        .required()
                        .max_length(200)
                        .searchable(),
                )
                .field(FieldSpec::integer("votes").min(0.0))
        })
    }

    fn id(&self) -> RecordId {
        self.id
    }

    async fn on_create(&mut self, questions: &Self::Context) -> Result<(), FrameworkError> {
        questions.ensure_exists("question", self.question).await
    }

    async fn on_update(&mut self, questions: &Self::Context) -> Result<(), FrameworkError> {
        questions.ensure_exists("question", self.question).await
    }
}
