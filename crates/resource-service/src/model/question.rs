//! A poll question. Its choices and marks are removed with it, and it is
//! removed itself when its last choice goes.

use chrono::{DateTime, Duration, Utc};
use resource_framework::{FieldSpec, Fields, RecordId, Resource, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: RecordId,
    pub question_text: String,
    pub pub_date: DateTime<Utc>,
}

impl Question {
    /// Published within the last day, and not scheduled for the future.
    pub fn was_published_recently(&self, now: DateTime<Utc>) -> bool {
        now - Duration::days(1) <= self.pub_date && self.pub_date <= now
    }
}

impl Resource for Question {
    const KIND: &'static str = "questions";
    type Context = ();

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(Self::KIND)
                .field(
                    FieldSpec::text("question_text")
                        .required()
                        .max_length(200)
                        .searchable(),
                )
                .field(FieldSpec::timestamp("pub_date").required().indexed())
                .computed("was_published_recently")
        })
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn computed(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(
            "was_published_recently".to_string(),
            Value::Bool(self.was_published_recently(Utc::now())),
        );
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(pub_date: DateTime<Utc>) -> Question {
        Question {
            id: RecordId(1),
            question_text: "What's up?".to_string(),
            pub_date,
        }
    }

    #[test]
    fn recent_means_within_the_last_day() {
        let now = Utc::now();
        assert!(question(now - Duration::hours(23)).was_published_recently(now));
        assert!(!question(now - Duration::days(2)).was_published_recently(now));
    }

    #[test]
    fn future_questions_are_not_recent() {
        let now = Utc::now();
        assert!(!question(now + Duration::days(30)).was_published_recently(now));
    }
}
