use crate::model::Department;
use async_trait::async_trait;
use resource_framework::{FieldSpec, FrameworkError, RecordId, Resource, ResourceClient, Schema};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A member of staff, attached to exactly one existing department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub department: RecordId,
}

#[async_trait]
impl Resource for Employee {
    const KIND: &'static str = "employees";
    /// Departments are consulted to check the `department` reference.
    type Context = ResourceClient<Department>;

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(Self::KIND)
                .field(
                    FieldSpec::text("name")
                        .required()
                        .max_length(50)
                        .unique()
                        .searchable(),
                )
                .field(
                    FieldSpec::text("email")
                        .required()
                        .max_length(50)
                        .email()
                        .unique()
                        .indexed(),
                )
                .field(FieldSpec::reference("department", Department::KIND).required())
        })
    }

    fn id(&self) -> RecordId {
        self.id
    }

    async fn on_create(&mut self, departments: &Self::Context) -> Result<(), FrameworkError> {
        departments.ensure_exists("department", self.department).await
    }

    async fn on_update(&mut self, departments: &Self::Context) -> Result<(), FrameworkError> {
        departments.ensure_exists("department", self.department).await
    }
}
