use resource_framework::{FieldSpec, RecordId, Resource, Schema};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// An organizational unit. Deleting a department deletes its employees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: RecordId,
    pub name: String,
}

impl Resource for Department {
    const KIND: &'static str = "departments";
    type Context = ();

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(Self::KIND).field(
                FieldSpec::text("name")
                    .required()
                    .max_length(50)
                    .unique()
                    .indexed()
                    .searchable(),
            )
        })
    }

    fn id(&self) -> RecordId {
        self.id
    }
}
