//! Bounded-concurrency batch execution over ID lists.
//!
//! IDs are processed in fixed-size batches. Calls within a batch run
//! concurrently; a batch completes fully before the next one starts.

use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use storeops_core::BulkReport;
use storeops_core::naming::{archived_file_name, timestamp_fragment};
use storeops_core::tabular::TabularError;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{OutputStore, StoreError};

/// Upper bound for in-flight requests per batch.
pub const MAX_CONCURRENCY: usize = 10;
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Errors that prevent a bulk run from starting or being recorded.
#[derive(Debug, Error)]
pub enum BulkError {
    #[error("Concurrency must be between 1 and {MAX_CONCURRENCY}, got {0}")]
    InvalidConcurrency(usize),

    #[error("Cannot read ID list {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed ID list {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("ID list {0} contains no IDs")]
    EmptyInput(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("CSV export failed: {0}")]
    Tabular(#[from] TabularError),
}

/// Check a concurrency level.
///
/// # Errors
///
/// Returns `BulkError::InvalidConcurrency` outside `1..=MAX_CONCURRENCY`.
pub const fn validate_concurrency(concurrency: usize) -> Result<usize, BulkError> {
    if concurrency == 0 || concurrency > MAX_CONCURRENCY {
        return Err(BulkError::InvalidConcurrency(concurrency));
    }
    Ok(concurrency)
}

/// Parse an ID list: the first CSV column of each line, trimmed.
///
/// Blank lines are dropped, as is a leading `id` header.
///
/// # Errors
///
/// Returns `csv::Error` if the text is not readable as CSV.
pub fn parse_id_list(text: &str) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut ids = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let Some(first) = row.get(0) else { continue };
        if first.is_empty() || (index == 0 && first.eq_ignore_ascii_case("id")) {
            continue;
        }
        ids.push(first.to_string());
    }
    Ok(ids)
}

/// Read and parse an ID list file.
///
/// # Errors
///
/// Returns `BulkError` if the file cannot be read, is malformed, or holds
/// no IDs.
pub async fn read_id_list(path: &Path) -> Result<Vec<String>, BulkError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BulkError::Input {
            path: path.to_path_buf(),
            source,
        })?;
    let ids = parse_id_list(&text).map_err(|source| BulkError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    if ids.is_empty() {
        return Err(BulkError::EmptyInput(path.to_path_buf()));
    }
    Ok(ids)
}

/// Run `op` over `items` in batches of `concurrency`.
///
/// Results are returned in input order.
pub async fn run_in_batches<'a, T, F, Fut, R>(items: &'a [T], concurrency: usize, mut op: F) -> Vec<R>
where
    F: FnMut(&'a T) -> Fut,
    Fut: Future<Output = R>,
{
    let mut results = Vec::with_capacity(items.len());
    let batches = items.len().div_ceil(concurrency.max(1));
    for (index, batch) in items.chunks(concurrency.max(1)).enumerate() {
        debug!(batch = index + 1, batches, size = batch.len(), "Starting batch");
        results.extend(join_all(batch.iter().map(&mut op)).await);
    }
    results
}

/// Write a finished report as `<kind>_report_<timestamp>.json`.
///
/// # Errors
///
/// Returns `StoreError` if the report cannot be written.
pub async fn write_report(
    store: &OutputStore,
    kind: &str,
    report: &BulkReport,
) -> Result<PathBuf, StoreError> {
    let stem = format!("{kind}_report_{}", timestamp_fragment(Utc::now()));
    let name = store.unique_name(&stem, "json").await?;
    store.write_json(&name, report).await
}

/// Move a processed input file into `archive_dir` with a timestamp suffix.
///
/// Falls back to copy and delete when a rename is not possible (for
/// example across filesystems).
///
/// # Errors
///
/// Returns `std::io::Error` if the file could not be moved.
pub async fn archive_input(
    path: &Path,
    archive_dir: &Path,
    at: DateTime<Utc>,
) -> Result<PathBuf, std::io::Error> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "input has no file name"))?;

    tokio::fs::create_dir_all(archive_dir).await?;
    let target = archive_dir.join(archived_file_name(file_name, at));

    if let Err(e) = tokio::fs::rename(path, &target).await {
        debug!(error = %e, "Rename failed, copying instead");
        tokio::fs::copy(path, &target).await?;
        tokio::fs::remove_file(path).await?;
    }

    info!(from = %path.display(), to = %target.display(), "Archived input file");
    Ok(target)
}

/// Archive `path`, logging instead of failing.
///
/// Returns the error text when the move failed.
pub async fn archive_or_warn(path: &Path, archive_dir: &Path) -> Result<PathBuf, String> {
    archive_input(path, archive_dir, Utc::now()).await.map_err(|e| {
        warn!(file = %path.display(), error = %e, "Failed to archive input file");
        e.to_string()
    })
}
