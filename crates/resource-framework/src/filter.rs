//! # List Queries
//!
//! Filtering, free-text search, ordering and windowing for `list` requests.
//!
//! Query-string form:
//!
//! | Parameter | Meaning |
//! |-----------|---------|
//! | `<field>=<value>` | equality on an indexed field |
//! | `q=<text>` | case-insensitive substring over searchable fields |
//! | `ordering=<field>` / `ordering=-<field>` | sort ascending / descending |
//! | `offset=<n>`, `limit=<n>` | result window |
//!
//! Without `ordering`, records come back in insertion order. Ties under a sort
//! key keep insertion order as well.

use crate::record::{to_fields, Fields};
use crate::schema::Schema;
use crate::validate::ValidationErrors;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

pub const SEARCH_PARAM: &str = "q";
pub const ORDERING_PARAM: &str = "ordering";
pub const LIMIT_PARAM: &str = "limit";
pub const OFFSET_PARAM: &str = "offset";

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// A parsed `list` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub equals: Vec<(String, Value)>,
    pub search: Option<String>,
    pub order_by: Option<SortKey>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.push((field.into(), value.into()));
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.order_by = Some(SortKey {
            field: field.into(),
            descending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Builds a query from query-string parameters, checking every parameter
    /// against `schema` and collecting all problems.
    pub fn from_params(
        schema: &Schema,
        params: &HashMap<String, String>,
    ) -> Result<Self, ValidationErrors> {
        let mut query = Self::new();
        let mut errors = ValidationErrors::new();
        let sorted: BTreeMap<&String, &String> = params.iter().collect();

        for (key, raw) in sorted {
            match key.as_str() {
                SEARCH_PARAM => {
                    if !raw.trim().is_empty() {
                        query.search = Some(raw.trim().to_string());
                    }
                }
                ORDERING_PARAM => {
                    let (field, descending) = match raw.strip_prefix('-') {
                        Some(field) => (field, true),
                        None => (raw.as_str(), false),
                    };
                    if schema.get(field).is_some() {
                        query = query.order_by(field, descending);
                    } else {
                        errors.push(ORDERING_PARAM, format!("Unknown ordering field \"{}\".", field));
                    }
                }
                LIMIT_PARAM => match raw.parse::<usize>() {
                    Ok(limit) => query.limit = Some(limit),
                    Err(_) => errors.push(LIMIT_PARAM, "A valid integer is required."),
                },
                OFFSET_PARAM => match raw.parse::<usize>() {
                    Ok(offset) => query.offset = offset,
                    Err(_) => errors.push(OFFSET_PARAM, "A valid integer is required."),
                },
                field => match schema.get(field) {
                    Some(spec) if spec.indexed => match spec.ty.parse_param(raw) {
                        Ok(value) => query.equals.push((field.to_string(), value)),
                        Err(reason) => errors.push(field, reason),
                    },
                    Some(_) => errors.push(field, "Filtering on this field is not supported."),
                    None => errors.push(field, "Unknown filter field."),
                },
            }
        }

        errors.into_result().map(|()| query)
    }

    /// True if the record's fields pass every filter and the search term.
    pub fn matches(&self, schema: &Schema, fields: &Fields) -> bool {
        let filters_pass = self
            .equals
            .iter()
            .all(|(field, expected)| fields.get(field).is_some_and(|v| values_equal(v, expected)));
        if !filters_pass {
            return false;
        }
        match &self.search {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                schema.fields().filter(|f| f.searchable).any(|f| {
                    fields
                        .get(f.name)
                        .and_then(Value::as_str)
                        .is_some_and(|s| s.to_lowercase().contains(&term))
                })
            }
        }
    }

    /// Filters, sorts and windows `records`, given in insertion order.
    pub fn select<'a, T>(
        &self,
        schema: &Schema,
        records: impl Iterator<Item = &'a T>,
    ) -> Result<Vec<T>, serde_json::Error>
    where
        T: serde::Serialize + Clone + 'a,
    {
        let mut rows = Vec::new();
        for record in records {
            let fields = to_fields(record)?;
            if self.matches(schema, &fields) {
                rows.push((fields, record));
            }
        }

        if let Some(key) = &self.order_by {
            // sort_by is stable, so ties keep insertion order
            rows.sort_by(|(a, _), (b, _)| {
                let ordering = compare(a.get(&key.field), b.get(&key.field));
                if key.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        Ok(rows
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .map(|(_, record)| record.clone())
            .collect())
    }
}

/// Equality that treats `10` and `10.0` as the same number.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .unwrap_or_default()
            .partial_cmp(&y.as_f64().unwrap_or_default())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, PartialEq)]
    struct Row {
        id: u32,
        name: &'static str,
        score: f64,
    }

    fn schema() -> Schema {
        Schema::new("rows")
            .field(FieldSpec::text("name").indexed().searchable())
            .field(FieldSpec::decimal("score"))
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { id: 1, name: "beta", score: 2.0 },
            Row { id: 2, name: "Alpha", score: 3.0 },
            Row { id: 3, name: "gamma", score: 2.0 },
        ]
    }

    #[test]
    fn parses_filters_ordering_and_window() {
        let query = ListQuery::from_params(
            &schema(),
            &params(&[("name", "beta"), ("ordering", "-score"), ("limit", "2"), ("offset", "1")]),
        )
        .unwrap();
        assert_eq!(query.equals, vec![("name".to_string(), json!("beta"))]);
        assert_eq!(
            query.order_by,
            Some(SortKey {
                field: "score".to_string(),
                descending: true
            })
        );
        assert_eq!((query.offset, query.limit), (1, Some(2)));
    }

    #[test]
    fn rejects_unindexed_and_unknown_parameters_together() {
        let errors = ListQuery::from_params(
            &schema(),
            &params(&[("score", "2"), ("colour", "red"), ("limit", "many")]),
        )
        .unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains("score"));
        assert!(errors.contains("colour"));
        assert!(errors.contains("limit"));
    }

    #[test]
    fn keeps_insertion_order_without_sort_key() {
        let rows = rows();
        let selected = ListQuery::new().select(&schema(), rows.iter()).unwrap();
        assert_eq!(selected, rows);
    }

    #[test]
    fn sorts_stably_and_windows() {
        let rows = rows();
        let selected = ListQuery::new()
            .order_by("score", false)
            .select(&schema(), rows.iter())
            .unwrap();
        let ids: Vec<u32> = selected.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);

        let selected = ListQuery::new()
            .order_by("score", true)
            .offset(1)
            .limit(1)
            .select(&schema(), rows.iter())
            .unwrap();
        assert_eq!(selected[0].id, 1);
    }

    #[test]
    fn searches_case_insensitively() {
        let rows = rows();
        let selected = ListQuery::new()
            .search("ALP")
            .select(&schema(), rows.iter())
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "Alpha");
    }

    #[test]
    fn numbers_compare_across_representations() {
        assert!(values_equal(&json!(10), &json!(10.0)));
        assert!(!values_equal(&json!("10"), &json!(10)));
    }
}
