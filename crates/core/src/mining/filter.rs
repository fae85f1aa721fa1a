//! Applying a condition over a record collection.

use super::analyzer::FieldTypeProfile;
use super::condition::CompiledCondition;
use crate::types::Record;

/// Keep the records whose `field` satisfies `condition`.
///
/// Single pass, original order preserved. Records without the field are
/// evaluated as null.
#[must_use]
pub fn filter_records(
    records: &[Record],
    field: &str,
    condition: &str,
    profile: &FieldTypeProfile,
) -> Vec<Record> {
    let compiled = CompiledCondition::new(profile.field_type, condition);
    records
        .iter()
        .filter(|record| compiled.matches(record.get(field)))
        .cloned()
        .collect()
}
