use crate::model::Question;
use async_trait::async_trait;
use resource_framework::validate::NON_FIELD_ERRORS;
use resource_framework::{
    FieldSpec, FrameworkError, RecordId, Resource, ResourceClient, Schema, ValidationErrors,
};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn default_total_marks() -> i64 {
    100
}

fn default_pass_marks() -> i64 {
    40
}

/// Grading scheme of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marks {
    pub id: RecordId,
    pub question: RecordId,
    #[serde(default = "default_total_marks")]
    pub total_marks: i64,
    #[serde(default = "default_pass_marks")]
    pub pass_marks: i64,
}

#[async_trait]
impl Resource for Marks {
    const KIND: &'static str = "marks";
    type Context = ResourceClient<Question>;

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(Self::KIND)
                .field(FieldSpec::reference("question", Question::KIND).required())
                .field(FieldSpec::integer("total_marks").min(1.0))
                .field(FieldSpec::integer("pass_marks").min(0.0))
        })
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn check(&self) -> Result<(), ValidationErrors> {
        if self.pass_marks > self.total_marks {
            return Err(ValidationErrors::single(
                NON_FIELD_ERRORS,
                "pass_marks cannot exceed total_marks.",
            ));
        }
        Ok(())
    }

    async fn on_create(&mut self, questions: &Self::Context) -> Result<(), FrameworkError> {
        questions.ensure_exists("question", self.question).await
    }

    async fn on_update(&mut self, questions: &Self::Context) -> Result<(), FrameworkError> {
        questions.ensure_exists("question", self.question).await
    }
}
