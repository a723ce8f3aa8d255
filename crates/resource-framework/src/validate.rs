//! # Validation Layer
//!
//! Field rules run before anything is persisted. Every failing field is
//! reported, not just the first one, so a caller can fix all problems in a
//! single round trip.

use crate::record::Fields;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

/// The set of all failed checks for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("validation failed on {} field(s)", .0.len())]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a set holding exactly one error.
    pub fn single(field: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, reason);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            reason: reason.into(),
        });
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    /// Adds the errors of `other` for fields this set does not mention yet.
    pub fn absorb(&mut self, other: ValidationErrors) {
        for error in other.0 {
            if !self.contains(&error.field) {
                self.0.push(error);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// True if at least one error concerns `field`.
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Runs the per-field rules of `schema` over `fields`.
///
/// With `existing = None` (create, full replacement) every required field must
/// be present and non-null in `fields`. With `existing = Some(current)` (partial
/// update) required fields are checked on `current` overlaid with `fields`.
/// Rules apply to every non-null value in `fields`; values already stored
/// passed them when they were written.
pub fn validate(
    schema: &Schema,
    fields: &Fields,
    existing: Option<&Fields>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    for spec in schema.writable() {
        let provided = fields.get(spec.name);
        let effective = match (provided, existing) {
            (Some(value), _) => Some(value),
            (None, Some(current)) => current.get(spec.name),
            (None, None) => None,
        };

        match effective {
            None if spec.required => errors.push(spec.name, "This field is required."),
            Some(Value::Null) if spec.required => {
                errors.push(spec.name, "This field may not be null.")
            }
            _ => {}
        }

        let Some(value) = provided.filter(|v| !v.is_null()) else {
            continue;
        };
        if let Err(reason) = spec.ty.coerce(value) {
            errors.push(spec.name, reason);
            continue;
        }
        if spec.required && value.as_str().is_some_and(|s| s.trim().is_empty()) {
            errors.push(spec.name, "This field may not be blank.");
            continue;
        }
        for rule in &spec.rules {
            if let Err(reason) = rule.check(value) {
                errors.push(spec.name, reason);
            }
        }
    }

    for name in fields.keys() {
        if schema.is_read_only(name) {
            errors.push(name.as_str(), "This field is read-only.");
        } else if schema.get(name).is_none() {
            errors.push(name.as_str(), "Unknown field.");
        }
    }

    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new("products")
            .field(FieldSpec::text("title").required().max_length(10))
            .field(FieldSpec::text("content"))
            .field(FieldSpec::decimal("price").min(0.0))
    }

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn accepts_valid_fields() {
        let input = fields(json!({"title": "A", "price": 10}));
        assert!(validate(&schema(), &input, None).is_ok());
    }

    #[test]
    fn absorb_skips_fields_already_reported() {
        let mut errors = ValidationErrors::single("price", "A valid number is required.");
        let mut more = ValidationErrors::single("price", "This field is required.");
        more.push("title", "This field is required.");
        errors.absorb(more);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.errors()[0].reason, "A valid number is required.");
        assert!(errors.contains("title"));
    }

    #[test]
    fn collects_every_failing_field() {
        let input = fields(json!({"title": "far too long title", "price": -1}));
        let errors = validate(&schema(), &input, None).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains("title"));
        assert!(errors.contains("price"));
    }

    #[test]
    fn reports_missing_null_and_blank_required_fields() {
        let errors = validate(&schema(), &fields(json!({})), None).unwrap_err();
        assert_eq!(errors.errors()[0].reason, "This field is required.");

        let errors = validate(&schema(), &fields(json!({"title": null})), None).unwrap_err();
        assert_eq!(errors.errors()[0].reason, "This field may not be null.");

        let errors = validate(&schema(), &fields(json!({"title": "  "})), None).unwrap_err();
        assert_eq!(errors.errors()[0].reason, "This field may not be blank.");
    }

    #[test]
    fn partial_updates_fall_back_to_existing_values() {
        let current = fields(json!({"id": 1, "title": "A", "price": 10}));
        let patch = fields(json!({"price": 3}));
        assert!(validate(&schema(), &patch, Some(&current)).is_ok());

        let patch = fields(json!({"price": -5}));
        let errors = validate(&schema(), &patch, Some(&current)).unwrap_err();
        assert_eq!(
            errors.errors(),
            &[FieldError {
                field: "price".to_string(),
                reason: "Ensure this value is greater than or equal to 0.".to_string(),
            }]
        );
    }

    #[test]
    fn flags_type_mismatches_and_unknown_fields() {
        let input = fields(json!({"title": "A", "price": "ten", "colour": "red"}));
        let errors = validate(&schema(), &input, None).unwrap_err();
        assert!(errors.contains("price"));
        assert!(errors.contains("colour"));
    }
}
