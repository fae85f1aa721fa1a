//! Data mining over a saved record set.
//!
//! `Load -> check field -> analyze -> check condition -> filter -> write`.
//! A condition that does not fit the inferred type only produces a warning;
//! filtering then uses the substring fallback.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use storeops_core::mining::{FieldAnalysis, MiningResult, analyze, describe_filter, filter_records, validate};
use storeops_core::naming::timestamp_fragment;
use storeops_core::tabular::{TabularError, to_delimited_text};
use storeops_core::{Record, field_present};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::store::{OutputStore, StoreError, read_json_file};

/// Errors that end a mining run. None of them leave output files behind.
#[derive(Debug, Error)]
pub enum MiningError {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Input {} is not a record set: {reason}", .path.display())]
    InvalidInput { path: PathBuf, reason: String },

    #[error("Field '{field}' is not present in any record")]
    FieldNotPresent { field: String },

    #[error("No records match {filter}")]
    NoMatches { filter: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("CSV export failed: {0}")]
    Tabular(#[from] TabularError),
}

/// Files written by a successful run.
#[derive(Debug, Clone)]
pub struct MiningOutcome {
    pub result: MiningResult,
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
}

/// Locate `source`: as given first, then inside the output directory.
///
/// # Errors
///
/// Returns `MiningError::InputNotFound` if neither exists.
pub async fn resolve_source(store: &OutputStore, source: &Path) -> Result<PathBuf, MiningError> {
    for candidate in [source.to_path_buf(), store.root().join(source)] {
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Ok(candidate);
        }
    }
    Err(MiningError::InputNotFound(source.to_path_buf()))
}

/// Records of a record-set object (`{ items: [...] }`) or a bare array.
///
/// Non-object entries are skipped with a warning.
///
/// # Errors
///
/// Returns a reason when the value has neither shape.
pub fn records_of(value: Value) -> Result<Vec<Record>, String> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("items") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err("'items' is not an array".to_string()),
            None => return Err("object has no 'items' array".to_string()),
        },
        other => return Err(format!("expected an object or array, got {other}")),
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(record) => records.push(record),
            other => warn!(index, item = %other, "Skipping non-object item"),
        }
    }
    Ok(records)
}

/// Filter the records in `source` by `field` and `condition` and write the
/// result as `<stem>_mined_<timestamp>.json` plus a CSV of the matches.
///
/// # Errors
///
/// Returns `MiningError` when the input is missing or malformed, the field
/// is absent from every record, nothing matches, or writing fails.
#[instrument(skip(store), fields(source = %source.display()))]
pub async fn mine(
    store: &OutputStore,
    source: &Path,
    field: &str,
    condition: &str,
) -> Result<MiningOutcome, MiningError> {
    let path = resolve_source(store, source).await?;
    let value: Value = read_json_file(&path).await?;
    let records = records_of(value).map_err(|reason| MiningError::InvalidInput {
        path: path.clone(),
        reason,
    })?;
    info!(records = records.len(), "Loaded records");

    if !field_present(&records, field) {
        return Err(MiningError::FieldNotPresent {
            field: field.to_string(),
        });
    }

    let profile = analyze(&records, field);
    info!(
        field,
        field_type = %profile.field_type,
        details = %profile.details,
        "Analyzed field"
    );

    if let Err(mismatch) = validate(profile.field_type, condition) {
        warn!(%mismatch, "Condition does not fit the field type, using text matching");
    }

    let filter = describe_filter(field, condition);
    let matches = filter_records(&records, field, condition, &profile);
    if matches.is_empty() {
        return Err(MiningError::NoMatches { filter });
    }

    let source_name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let stem = path
        .file_stem()
        .map_or_else(|| "result".to_string(), |s| s.to_string_lossy().into_owned());

    let csv = to_delimited_text(&matches)?;
    let result = MiningResult {
        source: source_name,
        filter,
        field_analysis: FieldAnalysis::new(field, &profile),
        original_count: records.len(),
        filtered_count: matches.len(),
        items: matches,
    };

    let base = format!("{stem}_mined_{}", timestamp_fragment(Utc::now()));
    let json_name = store.unique_name(&base, "json").await?;
    let json_path = store.write_json(&json_name, &result).await?;
    let csv_name = store.unique_name(&base, "csv").await?;
    let csv_path = store.write_text(&csv_name, &csv).await?;

    info!(
        original = result.original_count,
        filtered = result.filtered_count,
        file = %json_path.display(),
        "Mining complete"
    );

    Ok(MiningOutcome {
        result,
        json_path,
        csv_path,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use storeops_core::mining::FieldType;

    use super::*;

    #[test]
    fn test_records_of_shapes() {
        assert_eq!(records_of(json!({"items": [{"a": 1}, 2]})).unwrap().len(), 1);
        assert_eq!(records_of(json!([{"a": 1}, {"b": 2}])).unwrap().len(), 2);
        assert!(records_of(json!({"total": 3})).is_err());
        assert!(records_of(json!("text")).is_err());
    }

    #[tokio::test]
    async fn test_mine_writes_json_and_csv() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        store
            .write_json(
                "profiles.json",
                &json!({"total": 3, "env": "dev", "items": [
                    {"id": "1", "active": true},
                    {"id": "2", "active": false},
                    {"id": "3", "active": true}
                ]}),
            )
            .await
            .unwrap();

        let outcome = mine(&store, Path::new("profiles.json"), "active", "true").await.unwrap();

        assert_eq!(outcome.result.field_analysis.field_type, FieldType::Boolean);
        assert_eq!(outcome.result.original_count, 3);
        assert_eq!(outcome.result.filtered_count, 2);
        assert_eq!(outcome.result.filter, "active: true");
        let name = outcome.json_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("profiles_mined_"));

        let csv = tokio::fs::read_to_string(&outcome.csv_path).await.unwrap();
        assert_eq!(csv, "active,id\ntrue,1\ntrue,3\n");
    }

    #[tokio::test]
    async fn test_mine_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let err = mine(&store, Path::new("absent.json"), "a", "1").await.unwrap_err();
        assert!(matches!(err, MiningError::InputNotFound(_)));
    }

    #[tokio::test]
    async fn test_mine_field_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        store.write_json("set.json", &json!([{"a": null}])).await.unwrap();

        let err = mine(&store, Path::new("set.json"), "b", "x").await.unwrap_err();
        assert!(matches!(err, MiningError::FieldNotPresent { .. }));

        // Present-but-null counts as present
        let outcome = mine(&store, Path::new("set.json"), "a", "null").await.unwrap();
        assert_eq!(outcome.result.filtered_count, 1);
        assert_eq!(outcome.result.field_analysis.field_type, FieldType::Null);
    }

    #[tokio::test]
    async fn test_mine_no_matches_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        store.write_json("set.json", &json!([{"n": 1}, {"n": 2}])).await.unwrap();

        let err = mine(&store, Path::new("set.json"), "n", ">5").await.unwrap_err();

        assert!(matches!(err, MiningError::NoMatches { .. }));
        assert_eq!(store.list().await.unwrap(), vec!["set.json"]);
    }

    #[tokio::test]
    async fn test_mine_mismatched_condition_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        store
            .write_json("set.json", &json!([{"n": 1}, {"n": 2}, {"n": 3}, {"n": "50abc"}]))
            .await
            .unwrap();

        let outcome = mine(&store, Path::new("set.json"), "n", "abc").await.unwrap();
        assert_eq!(outcome.result.field_analysis.field_type, FieldType::Number);
        assert_eq!(outcome.result.filtered_count, 1);
    }
}
