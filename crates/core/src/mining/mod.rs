//! Typed data mining over schema-free records.
//!
//! - [`analyzer`] - infer a field's semantic type from samples
//! - [`condition`] - parse and evaluate a condition for that type
//! - [`filter`] - apply a condition over a collection
//! - [`scalar`] - shared boolean/number/date interpretation of JSON values

pub mod analyzer;
pub mod condition;
pub mod filter;
pub mod scalar;

pub use analyzer::{FieldType, FieldTypeProfile, SAMPLE_LIMIT, TYPE_THRESHOLD_PERCENT, analyze};
pub use condition::{CompiledCondition, ConditionMismatch, TypedCondition, test, validate};
pub use filter::filter_records;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Record;

/// Field analysis summary stored with a mining result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAnalysis {
    pub field: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub details: String,
    pub examples: Vec<Value>,
}

impl FieldAnalysis {
    #[must_use]
    pub fn new(field: &str, profile: &FieldTypeProfile) -> Self {
        Self {
            field: field.to_string(),
            field_type: profile.field_type,
            details: profile.details.clone(),
            examples: profile.examples.clone(),
        }
    }
}

/// Outcome of one mining invocation, written once and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiningResult {
    /// File the records were read from.
    pub source: String,
    /// `"<field>: <condition>"`.
    pub filter: String,
    pub field_analysis: FieldAnalysis,
    pub original_count: usize,
    pub filtered_count: usize,
    pub items: Vec<Record>,
}

/// Describe a filter for reports and result files.
#[must_use]
pub fn describe_filter(field: &str, condition: &str) -> String {
    format!("{field}: {condition}")
}
