//! # Serialization Layer
//!
//! Maps stored records to external payloads and back.
//!
//! * [`to_external`] adds the record's `url`, its computed fields, and renders
//!   reference fields as handles (`{"id": 3, "url": "/questions/3"}`).
//! * [`from_external`] strips read-only fields, rejects unknown ones and
//!   type-checks the rest, collecting every problem.
//!
//! Feeding the output of `to_external` back into `from_external` yields the
//! record's mutable fields unchanged.

use crate::entity::Resource;
use crate::record::{record_url, to_fields, Fields, RecordId};
use crate::schema::{Schema, URL_FIELD};
use crate::validate::{ValidationErrors, NON_FIELD_ERRORS};
use serde_json::{json, Value};

/// The external (wire) representation of a record.
pub type Payload = Value;

/// Renders a record as its external payload.
pub fn to_external<T: Resource>(record: &T) -> Result<Payload, serde_json::Error> {
    let schema = T::schema();
    let mut fields = to_fields(record)?;

    for (name, kind) in schema.references() {
        if let Some(id) = fields.get(name).and_then(RecordId::from_value) {
            fields.insert(name.to_string(), reference_handle(kind, id));
        }
    }
    fields.insert(
        URL_FIELD.to_string(),
        Value::String(record_url(T::KIND, record.id())),
    );
    for (name, value) in record.computed() {
        fields.insert(name, value);
    }

    Ok(Value::Object(fields))
}

/// Reference handle pointing at another record.
pub fn reference_handle(kind: &str, id: RecordId) -> Value {
    json!({ "id": id.0, "url": record_url(kind, id) })
}

/// Decodes an incoming payload into writable fields.
pub fn from_external<T: Resource>(payload: &Payload) -> Result<Fields, ValidationErrors> {
    decode(T::schema(), payload)
}

/// Schema-driven body of [`from_external`].
pub fn decode(schema: &Schema, payload: &Payload) -> Result<Fields, ValidationErrors> {
    let (fields, errors) = decode_partial(schema, payload)?;
    errors.into_result().map(|()| fields)
}

/// Like [`decode`], but keeps the fields that decoded cleanly alongside the
/// errors of the ones that did not, so later rule checks can still run over
/// them. Only a payload that is not an object fails outright.
pub fn decode_partial(
    schema: &Schema,
    payload: &Payload,
) -> Result<(Fields, ValidationErrors), ValidationErrors> {
    let Some(object) = payload.as_object() else {
        return Err(ValidationErrors::single(
            NON_FIELD_ERRORS,
            "Invalid data. Expected a dictionary.",
        ));
    };

    let mut fields = Fields::new();
    let mut errors = ValidationErrors::new();

    for (name, value) in object {
        if schema.is_read_only(name) {
            continue;
        }
        match schema.get(name) {
            Some(spec) => match spec.ty.coerce(value) {
                Ok(value) => {
                    fields.insert(name.clone(), value);
                }
                Err(reason) => errors.push(name.as_str(), reason),
            },
            None => errors.push(name.as_str(), "Unknown field."),
        }
    }

    Ok((fields, errors))
}
