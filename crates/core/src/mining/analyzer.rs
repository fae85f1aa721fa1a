//! Field type inference from sample values.
//!
//! The dominant semantic type of a field is guessed from the first
//! [`SAMPLE_LIMIT`] non-null values found across the records. Each sample is
//! classified into exactly one category; the first category (in the order
//! boolean, number, date, string) holding at least
//! [`TYPE_THRESHOLD_PERCENT`] of the samples wins. When none does, the field
//! is treated as a string.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::scalar::{as_date_like, as_finite_number, is_boolean_like};
use crate::types::Record;

/// Maximum number of non-null samples inspected per field.
pub const SAMPLE_LIMIT: usize = 100;

/// Share of samples (in percent) a category needs to become the field type.
pub const TYPE_THRESHOLD_PERCENT: usize = 70;

/// Number of raw sample values kept as examples.
pub const EXAMPLE_COUNT: usize = 3;

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// No non-null values were found.
    Null,
    Boolean,
    Number,
    Date,
    String,
}

impl FieldType {
    /// Categories a sample can fall into, in threshold priority order.
    pub const SAMPLE_CATEGORIES: [Self; 4] = [Self::Boolean, Self::Number, Self::Date, Self::String];

    /// Lowercase name, as shown to users.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::Date => "date",
            Self::String => "string",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "null" => Ok(Self::Null),
            "boolean" => Ok(Self::Boolean),
            "number" => Ok(Self::Number),
            "date" => Ok(Self::Date),
            "string" => Ok(Self::String),
            _ => Err(format!("invalid field type: {s}")),
        }
    }
}

/// Inferred type of one field plus the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTypeProfile {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Human-readable support, e.g. `"3/3 number values"`.
    pub details: String,
    /// Up to [`EXAMPLE_COUNT`] raw samples, in record order.
    pub examples: Vec<Value>,
}

/// Classify a single non-null sample. First match wins.
#[must_use]
pub fn classify(value: &Value) -> FieldType {
    if is_boolean_like(value) {
        FieldType::Boolean
    } else if as_finite_number(value).is_some() {
        FieldType::Number
    } else if as_date_like(value).is_some() {
        FieldType::Date
    } else {
        FieldType::String
    }
}

/// Gather up to [`SAMPLE_LIMIT`] non-null values of `field`, in record order.
#[must_use]
pub fn collect_samples<'a>(records: &'a [Record], field: &str) -> Vec<&'a Value> {
    records
        .iter()
        .filter_map(|record| record.get(field))
        .filter(|value| !value.is_null())
        .take(SAMPLE_LIMIT)
        .collect()
}

/// Whether `count` out of `total` samples reaches the type threshold.
#[must_use]
pub const fn meets_threshold(count: usize, total: usize) -> bool {
    total > 0 && count * 100 >= total * TYPE_THRESHOLD_PERCENT
}

/// Infer the dominant type of `field` across `records`.
#[must_use]
pub fn analyze(records: &[Record], field: &str) -> FieldTypeProfile {
    let samples = collect_samples(records, field);
    let total = samples.len();

    if total == 0 {
        return FieldTypeProfile {
            field_type: FieldType::Null,
            details: "no non-null values".to_string(),
            examples: Vec::new(),
        };
    }

    let categories: Vec<FieldType> = samples.iter().map(|sample| classify(sample)).collect();
    let count_of = |ty: FieldType| categories.iter().filter(|c| **c == ty).count();

    let field_type = FieldType::SAMPLE_CATEGORIES
        .into_iter()
        .find(|ty| meets_threshold(count_of(*ty), total))
        .unwrap_or(FieldType::String);
    let count = count_of(field_type);

    FieldTypeProfile {
        field_type,
        details: format!("{count}/{total} {field_type} values"),
        examples: samples.into_iter().take(EXAMPLE_COUNT).cloned().collect(),
    }
}
