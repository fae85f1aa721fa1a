//! Conversion of record collections into comma-separated text.
//!
//! The column set of [`to_delimited_text`] is the sorted union of every key
//! found in any record, so records with differing shapes line up. Objects
//! and arrays are rendered as compact JSON. Cells are quoted only when they
//! contain a delimiter, a quote or a line break.

use std::collections::BTreeSet;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde_json::Value;
use thiserror::Error;

use crate::types::{Record, lookup_path, value_text};

/// Errors produced while rendering CSV text.
#[derive(Debug, Error)]
pub enum TabularError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV flush error: {0}")]
    Flush(String),

    #[error("CSV output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Sorted union of the keys of all records.
#[must_use]
pub fn column_union(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .flat_map(|record| record.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Text of one cell. Missing and null values are empty.
#[must_use]
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(value) => value_text(value),
    }
}

/// Render records as CSV with a header row of the union of their keys.
///
/// # Errors
///
/// Returns [`TabularError`] if the CSV writer fails.
pub fn to_delimited_text(records: &[Record]) -> Result<String, TabularError> {
    let columns = column_union(records);
    to_delimited_rows(&columns, records, true)
}

/// Render records projected onto `columns`.
///
/// A column is looked up as a plain key first, then as a dotted path into
/// nested objects. With `with_header = false` only data rows are produced,
/// for appending to an existing file.
///
/// # Errors
///
/// Returns [`TabularError`] if the CSV writer fails.
pub fn to_delimited_rows(
    columns: &[String],
    records: &[Record],
    with_header: bool,
) -> Result<String, TabularError> {
    if columns.is_empty() {
        return Ok(String::new());
    }

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    if with_header {
        writer.write_record(columns)?;
    }

    for record in records {
        let row = columns.iter().map(|column| {
            let value = record.get(column).or_else(|| lookup_path(record, column));
            cell_text(value)
        });
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TabularError::Flush(e.error().to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: &[Value]) -> Vec<Record> {
        values
            .iter()
            .filter_map(|v| v.as_object().cloned())
            .collect()
    }

    #[test]
    fn test_header_is_sorted_union() {
        let records = records(&[json!({"b": 1, "a": 2}), json!({"c": 3})]);
        let text = to_delimited_text(&records).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("a,b,c"));
        assert_eq!(lines.next(), Some("2,1,"));
        assert_eq!(lines.next(), Some(",,3"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_nested_values_are_json() {
        let records = records(&[json!({"tags": ["x", "y"], "meta": {"k": 1}})]);
        let text = to_delimited_text(&records).unwrap();
        assert_eq!(text, "meta,tags\n\"{\"\"k\"\":1}\",\"[\"\"x\"\",\"\"y\"\"]\"\n");
    }

    #[test]
    fn test_plain_values_unquoted() {
        let records = records(&[json!({"name": "plain text", "n": 1.5, "ok": true, "gone": null})]);
        let text = to_delimited_text(&records).unwrap();
        assert_eq!(text, "gone,n,name,ok\n,1.5,plain text,true\n");
    }

    #[test]
    fn test_round_trip_through_reader() {
        let original = "comma, \"quote\" and\nnewline";
        let records = records(&[json!({"note": original, "id": "1"})]);
        let text = to_delimited_text(&records).unwrap();

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["id", "note"]);
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(row.get(1), Some(original));
    }

    #[test]
    fn test_projection_with_dotted_paths_and_no_header() {
        let records = records(&[json!({"order_no": "O1", "customer_info": {"email": "a@b.co"}})]);
        let columns = vec!["order_no".to_string(), "customer_info.email".to_string()];
        let text = to_delimited_rows(&columns, &records, false).unwrap();
        assert_eq!(text, "O1,a@b.co\n");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(to_delimited_text(&[]).unwrap(), "");
    }
}
