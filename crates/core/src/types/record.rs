//! Schema-free records and record sets.
//!
//! Records coming back from the admin API have no fixed shape: any field may
//! be missing on any record, and values can be any JSON type. A [`Record`] is
//! therefore just a JSON object, and every field access is a dynamic lookup
//! that distinguishes "absent" from "present but null".

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One schema-free entity (profile, product, order).
pub type Record = Map<String, Value>;

/// An ordered collection of records plus run metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Count reported by the upstream service (may disagree with `items.len()`).
    #[serde(default)]
    pub total: u64,
    /// Environment the records were fetched from.
    #[serde(default)]
    pub env: String,
    /// File the records were read from, when derived from another file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Human-readable description of the filter that produced this set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// The records themselves.
    #[serde(default)]
    pub items: Vec<Record>,
}

impl RecordSet {
    /// Create a record set for an environment.
    #[must_use]
    pub fn new(env: impl Into<String>, total: u64, items: Vec<Record>) -> Self {
        Self {
            total,
            env: env.into(),
            source: None,
            filter: None,
            items,
        }
    }

    /// Number of records actually held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Whether any record carries `field` (null values count as present).
#[must_use]
pub fn field_present(records: &[Record], field: &str) -> bool {
    records.iter().any(|record| record.contains_key(field))
}

/// Resolve a dotted path (`customer_info.email`) inside a record.
///
/// A path without dots is a plain key lookup. Returns `None` when any
/// segment is missing or an intermediate value is not an object.
#[must_use]
pub fn lookup_path<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = record.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// The string form of a value, as used for matching and display.
///
/// Strings are returned without quotes; every other value uses its JSON text.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
