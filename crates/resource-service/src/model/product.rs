//! A product in the catalog, owned by the caller who listed it.
//!
//! An empty `content` falls back to the title, on creation and on every
//! update. Renderings carry:
//! * `sale_price`, 80% of `price`
//! * `name` and `edit_url`
//! * the owner as a public user object (`{"username": ...}`)
//! * `related_products`, every product of the same owner as `{title, url}`

use resource_framework::record::record_url;
use resource_framework::{
    CallerId, FieldSpec, Fields, ListQuery, Payload, RecordId, Resource, Schema,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::OnceLock;

pub const DEFAULT_PRICE: f64 = 99.99;

fn default_price() -> f64 {
    DEFAULT_PRICE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default = "default_price")]
    pub price: f64,
    #[serde(default)]
    pub owner: Option<CallerId>,
}

impl Product {
    /// Price after the standard 20% discount, rounded to cents.
    pub fn sale_price(&self) -> f64 {
        (self.price * 0.8 * 100.0).round() / 100.0
    }
}

fn title_no_hello(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some(title) if title.to_lowercase().contains("hello") => {
            Err("hello is not allowed in the title.".to_string())
        }
        _ => Ok(()),
    }
}

impl Resource for Product {
    const KIND: &'static str = "products";
    type Context = ();

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(Self::KIND)
                .field(
                    FieldSpec::text("title")
                        .required()
                        .max_length(120)
                        .unique_case_insensitive()
                        .searchable()
                        .custom(title_no_hello),
                )
                .field(FieldSpec::text("content").searchable())
                .field(FieldSpec::decimal("price").min(0.0).decimal_places(2))
                .owned_by("owner")
                .computed("sale_price")
                .computed("name")
                .computed("edit_url")
                .computed("related_products")
        })
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn owner(&self) -> Option<&CallerId> {
        self.owner.as_ref()
    }

    fn prepare(fields: &mut Fields, existing: Option<&Fields>) {
        if effective(fields, existing, "content").is_some_and(|content| !is_empty(content)) {
            return;
        }
        let title = effective(fields, existing, "title")
            .filter(|title| title.is_string())
            .cloned();
        if let Some(title) = title {
            fields.insert("content".to_string(), title);
        }
    }

    fn computed(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("sale_price".to_string(), Value::from(self.sale_price()));
        fields.insert("name".to_string(), Value::String(self.title.clone()));
        fields.insert(
            "edit_url".to_string(),
            Value::String(format!("{}/update", record_url(Self::KIND, self.id))),
        );
        if let Some(owner) = &self.owner {
            fields.insert("owner".to_string(), json!({ "username": owner.0 }));
        }
        fields
    }

    fn related(&self) -> Option<(&'static str, ListQuery)> {
        let owner = self.owner.as_ref()?;
        let query = ListQuery::new().filter("owner", owner.0.clone());
        Some(("related_products", query))
    }

    fn brief(&self) -> Payload {
        json!({ "title": self.title, "url": record_url(Self::KIND, self.id) })
    }
}

/// The value a write leaves in `name`: incoming if present, else stored.
fn effective<'a>(fields: &'a Fields, existing: Option<&'a Fields>, name: &str) -> Option<&'a Value> {
    fields
        .get(name)
        .or_else(|| existing.and_then(|current| current.get(name)))
}

fn is_empty(value: &Value) -> bool {
    value.is_null() || value.as_str().is_some_and(str::is_empty)
}
