//! # Record Identity
//!
//! Type-safe identifiers for stored records and the field map used to move
//! record data between the layers.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// A field name → value mapping.
///
/// This is the shape payloads take once decoded, and the shape the store
/// validates before it materializes a typed record.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Store-assigned identifier of a record, unique within its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u32);

impl From<u32> for RecordId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(Self)
    }
}

impl RecordId {
    /// Reads an id out of a JSON value (a plain number).
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Self)
    }
}

/// Serializes a record into its field map.
pub fn to_fields<T: Serialize>(record: &T) -> Result<Fields, serde_json::Error> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(fields) => Ok(fields),
        _ => Err(<serde_json::Error as serde::ser::Error>::custom(
            "record must serialize to a JSON object",
        )),
    }
}

/// Path of a record in the external interface (`/products/3`).
pub fn record_url(kind: &str, id: RecordId) -> String {
    format!("/{}/{}", kind, id)
}
