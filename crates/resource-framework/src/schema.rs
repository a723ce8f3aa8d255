//! # Record Schemas
//!
//! Every record kind declares its fields explicitly: name, type, whether the
//! field is required, unique, filterable, searchable, and which rules its
//! values must satisfy. A [`Schema`] is built once per kind and never changes
//! afterwards.
//!
//! ```rust
//! use resource_framework::schema::{FieldSpec, Schema};
//!
//! let schema = Schema::new("products")
//!     .field(FieldSpec::text("title").required().max_length(120).unique())
//!     .field(FieldSpec::decimal("price").min(0.0))
//!     .owned_by("owner")
//!     .computed("sale_price");
//!
//! assert!(schema.is_read_only("id"));
//! assert!(schema.is_read_only("owner"));
//! assert!(schema.is_read_only("sale_price"));
//! assert!(!schema.is_read_only("title"));
//! ```

use crate::record::RecordId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// The type of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Decimal,
    Boolean,
    /// RFC 3339 date-time, stored in UTC.
    Timestamp,
    /// Foreign reference to a record of the named kind.
    Reference(&'static str),
}

impl FieldType {
    /// Checks that `value` has this type and returns its canonical form.
    ///
    /// `null` passes through untouched; whether it is acceptable is decided by
    /// the validation layer. References accept either a bare id or a reference
    /// handle (`{"id": 3, "url": "/questions/3"}`) and are normalized to the id.
    pub fn coerce(&self, value: &Value) -> Result<Value, String> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            FieldType::Text => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err("Not a valid string.".to_string()),
            },
            FieldType::Integer => match value.as_i64() {
                Some(n) => Ok(Value::from(n)),
                None => match value.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(Value::from(f as i64))
                    }
                    _ => Err("A valid integer is required.".to_string()),
                },
            },
            FieldType::Decimal => match value {
                Value::Number(_) => Ok(value.clone()),
                _ => Err("A valid number is required.".to_string()),
            },
            FieldType::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                _ => Err("Must be a valid boolean.".to_string()),
            },
            FieldType::Timestamp => match value {
                Value::String(raw) => parse_timestamp(raw).map(Value::String),
                _ => Err(timestamp_error()),
            },
            FieldType::Reference(_) => {
                let id = match value {
                    Value::Object(handle) => handle.get("id").and_then(RecordId::from_value),
                    other => RecordId::from_value(other),
                };
                id.map(|id| Value::from(id.0)).ok_or_else(|| {
                    format!(
                        "Incorrect type. Expected pk value, received {}.",
                        json_type_name(value)
                    )
                })
            }
        }
    }

    /// Parses a query-string value into this type.
    pub fn parse_param(&self, raw: &str) -> Result<Value, String> {
        match self {
            FieldType::Text | FieldType::Timestamp => self.coerce(&Value::String(raw.to_string())),
            FieldType::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err("Must be a valid boolean.".to_string()),
            },
            FieldType::Integer | FieldType::Reference(_) => raw
                .parse::<i64>()
                .map_err(|_| "A valid integer is required.".to_string())
                .and_then(|n| self.coerce(&Value::from(n))),
            FieldType::Decimal => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| "A valid number is required.".to_string()),
        }
    }
}

fn parse_timestamp(raw: &str) -> Result<String, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| {
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::AutoSi, true)
        })
        .map_err(|_| timestamp_error())
}

fn timestamp_error() -> String {
    "Datetime has wrong format. Use RFC 3339.".to_string()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// How a unique field compares values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uniqueness {
    Exact,
    /// Text values collide regardless of case (`iexact`).
    CaseInsensitive,
}

/// A constraint on the values of one field.
#[derive(Debug, Clone)]
pub enum Rule {
    MinLength(usize),
    MaxLength(usize),
    Min(f64),
    Max(f64),
    Email,
    /// At most this many digits after the decimal point.
    DecimalPlaces(u32),
    /// A kind-specific check returning the failure reason.
    Custom(fn(&Value) -> Result<(), String>),
}

impl Rule {
    /// Applies the rule to a non-null value.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Rule::MinLength(min) => match value.as_str() {
                Some(s) if s.chars().count() < *min => Err(format!(
                    "Ensure this field has at least {} characters.",
                    min
                )),
                _ => Ok(()),
            },
            Rule::MaxLength(max) => match value.as_str() {
                Some(s) if s.chars().count() > *max => Err(format!(
                    "Ensure this field has no more than {} characters.",
                    max
                )),
                _ => Ok(()),
            },
            Rule::Min(min) => match value.as_f64() {
                Some(n) if n < *min => Err(format!(
                    "Ensure this value is greater than or equal to {}.",
                    min
                )),
                _ => Ok(()),
            },
            Rule::Max(max) => match value.as_f64() {
                Some(n) if n > *max => Err(format!(
                    "Ensure this value is less than or equal to {}.",
                    max
                )),
                _ => Ok(()),
            },
            Rule::Email => match value.as_str() {
                Some(s) if is_email(s) => Ok(()),
                _ => Err("Enter a valid email address.".to_string()),
            },
            Rule::DecimalPlaces(places) => match value.as_f64() {
                Some(n) if !has_decimal_places(n, *places) => Err(format!(
                    "Ensure that there are no more than {} decimal places.",
                    places
                )),
                _ => Ok(()),
            },
            Rule::Custom(check) => check(value),
        }
    }
}

/// Counts digits on the shortest decimal form that round-trips to `n`, so
/// `99.99` has two places even though the float is not exactly 99.99.
fn has_decimal_places(n: f64, places: u32) -> bool {
    let shortest = n.to_string();
    let digits = shortest.split_once('.').map_or(0, |(_, fraction)| fraction.len());
    digits <= places as usize
}

fn is_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !s.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Declaration of one field of a record kind.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub read_only: bool,
    pub unique: Option<Uniqueness>,
    pub indexed: bool,
    pub searchable: bool,
    pub rules: Vec<Rule>,
}

impl FieldSpec {
    pub fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
            read_only: false,
            unique: None,
            indexed: false,
            searchable: false,
            rules: Vec::new(),
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn decimal(name: &'static str) -> Self {
        Self::new(name, FieldType::Decimal)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn timestamp(name: &'static str) -> Self {
        Self::new(name, FieldType::Timestamp)
    }

    /// A foreign reference; references are always filterable.
    pub fn reference(name: &'static str, kind: &'static str) -> Self {
        Self::new(name, FieldType::Reference(kind)).indexed()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = Some(Uniqueness::Exact);
        self
    }

    pub fn unique_case_insensitive(mut self) -> Self {
        self.unique = Some(Uniqueness::CaseInsensitive);
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn min_length(self, min: usize) -> Self {
        self.rule(Rule::MinLength(min))
    }

    pub fn max_length(self, max: usize) -> Self {
        self.rule(Rule::MaxLength(max))
    }

    pub fn min(self, min: f64) -> Self {
        self.rule(Rule::Min(min))
    }

    pub fn max(self, max: f64) -> Self {
        self.rule(Rule::Max(max))
    }

    pub fn email(self) -> Self {
        self.rule(Rule::Email)
    }

    pub fn decimal_places(self, places: u32) -> Self {
        self.rule(Rule::DecimalPlaces(places))
    }

    pub fn custom(self, check: fn(&Value) -> Result<(), String>) -> Self {
        self.rule(Rule::Custom(check))
    }

    /// Target kind if this field is a reference.
    pub fn reference_kind(&self) -> Option<&'static str> {
        match self.ty {
            FieldType::Reference(kind) => Some(kind),
            _ => None,
        }
    }
}

/// The full field list of one record kind.
#[derive(Debug, Clone)]
pub struct Schema {
    kind: &'static str,
    fields: Vec<FieldSpec>,
    owner_field: Option<&'static str>,
    computed: Vec<&'static str>,
}

/// Computed link to the record itself, present on every payload.
pub const URL_FIELD: &str = "url";

impl Schema {
    /// Starts a schema with the read-only `id` field.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            fields: vec![FieldSpec::integer("id").read_only().indexed()],
            owner_field: None,
            computed: Vec::new(),
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Designates `name` as the ownership field. It holds the creating
    /// caller's id and can never be written through a payload.
    pub fn owned_by(mut self, name: &'static str) -> Self {
        self.owner_field = Some(name);
        self.fields.push(FieldSpec::text(name).read_only().indexed());
        self
    }

    /// Declares a computed (output-only) field.
    pub fn computed(mut self, name: &'static str) -> Self {
        self.computed.push(name);
        self
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    /// Fields a payload may set.
    pub fn writable(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| !f.read_only)
    }

    pub fn is_read_only(&self, name: &str) -> bool {
        name == URL_FIELD
            || self.computed.contains(&name)
            || self.get(name).is_some_and(|f| f.read_only)
    }

    pub fn owner_field(&self) -> Option<&'static str> {
        self.owner_field
    }

    pub fn is_ownable(&self) -> bool {
        self.owner_field.is_some()
    }

    /// `(field, target kind)` for every reference field.
    pub fn references(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.fields
            .iter()
            .filter_map(|f| f.reference_kind().map(|kind| (f.name, kind)))
    }
}
