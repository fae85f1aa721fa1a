//! Bulk product deletion.
//!
//! IDs without the required prefix are skipped and never sent. The rest are
//! deleted in concurrent batches, with one outcome per ID in the report.

use std::path::{Path, PathBuf};

use storeops_core::{BulkOperation, BulkReport};
use tracing::{error, info, instrument, warn};

use crate::api::{ApiError, ProductApi};
use crate::bulk::{BulkError, archive_or_warn, read_id_list, run_in_batches, validate_concurrency, write_report};
use crate::consolidate::DEFAULT_ID_PREFIX;
use crate::store::OutputStore;

/// Settings for a deletion run.
#[derive(Debug, Clone)]
pub struct DeleteOptions {
    pub environment: String,
    pub concurrency: usize,
    /// IDs must start with this to be submitted.
    pub required_prefix: String,
}

impl DeleteOptions {
    /// Options with the default `PA` prefix.
    ///
    /// # Errors
    ///
    /// Returns `BulkError::InvalidConcurrency` outside `1..=10`.
    pub fn new(environment: impl Into<String>, concurrency: usize) -> Result<Self, BulkError> {
        Ok(Self {
            environment: environment.into(),
            concurrency: validate_concurrency(concurrency)?,
            required_prefix: DEFAULT_ID_PREFIX.to_string(),
        })
    }
}

/// Everything a file-driven deletion run produced.
#[derive(Debug)]
pub struct DeleteOutcome {
    pub report: BulkReport,
    pub report_path: PathBuf,
    /// Where the input list was archived, or why it could not be.
    pub archived: Result<PathBuf, String>,
}

/// Delete `ids`, returning the finished report.
#[instrument(skip(api, ids, options), fields(count = ids.len(), concurrency = options.concurrency))]
pub async fn delete_products<A: ProductApi>(api: &A, ids: &[String], options: &DeleteOptions) -> BulkReport {
    let mut report = BulkReport::start(
        BulkOperation::Delete,
        options.environment.clone(),
        ids.len(),
        options.concurrency,
    );

    let (eligible, skipped): (Vec<&String>, Vec<&String>) = ids
        .iter()
        .partition(|id| id.starts_with(&options.required_prefix));
    for id in &skipped {
        warn!(id = %id, prefix = %options.required_prefix, "Skipping ID without required prefix");
        report.record_skip();
    }

    let outcomes = run_in_batches(&eligible, options.concurrency, |id| async move {
        (id.as_str(), api.delete_product(id).await)
    })
    .await;

    for (id, outcome) in outcomes {
        match outcome {
            Ok(()) => {
                info!(id, "Deleted product");
                report.record_success();
            }
            Err(e) => {
                record_error(&mut report, id, &e);
            }
        }
    }

    report.finish();
    report
}

fn record_error(report: &mut BulkReport, id: &str, e: &ApiError) {
    if e.is_not_found() {
        warn!(id, "Product not found");
    } else {
        error!(id, error = %e, "Failed to delete product");
    }
    report.record_failure(id, e.to_string(), e.status_code());
}

/// Delete every ID listed in `input`, write the report, archive the input.
///
/// # Errors
///
/// Returns `BulkError` if the list cannot be read or the report cannot be
/// written. Per-ID failures and archive failures are recorded, not raised.
pub async fn delete_from_file<A: ProductApi>(
    api: &A,
    store: &OutputStore,
    input: &Path,
    archive_dir: &Path,
    options: &DeleteOptions,
) -> Result<DeleteOutcome, BulkError> {
    let ids = read_id_list(input).await?;
    info!(file = %input.display(), count = ids.len(), "Loaded IDs");

    let report = delete_products(api, &ids, options).await;
    let report_path = write_report(store, "deletion", &report).await?;
    let archived = archive_or_warn(input, archive_dir).await;

    Ok(DeleteOutcome {
        report,
        report_path,
        archived,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeProducts {
        existing: HashSet<String>,
        failing: HashSet<String>,
        submitted: Mutex<Vec<String>>,
    }

    impl FakeProducts {
        fn with(existing: &[&str]) -> Self {
            Self {
                existing: existing.iter().map(ToString::to_string).collect(),
                ..Self::default()
            }
        }
    }

    impl ProductApi for FakeProducts {
        async fn delete_product(&self, id: &str) -> Result<(), ApiError> {
            self.submitted.lock().unwrap().push(id.to_string());
            if self.failing.contains(id) {
                return Err(ApiError::Status {
                    status: 500,
                    message: "internal".to_string(),
                });
            }
            if self.existing.contains(id) {
                Ok(())
            } else {
                Err(ApiError::NotFound(format!("/products/{id}")))
            }
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_delete_counts_outcomes() {
        let mut api = FakeProducts::with(&["PA1", "PA2"]);
        api.failing.insert("PA4".to_string());
        let options = DeleteOptions::new("staging", 2).unwrap();

        let report = delete_products(&api, &ids(&["PA1", "PA2", "PA3", "PA4", "XX5"]), &options).await;

        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.not_found_count(), 1);
        assert!(report.end_time.is_some());
        let codes: Vec<Option<u16>> = report.errors.iter().map(|e| e.status_code).collect();
        assert_eq!(codes, vec![Some(404), Some(500)]);
    }

    #[tokio::test]
    async fn test_unprefixed_ids_never_submitted() {
        let api = FakeProducts::with(&["PA1"]);
        let options = DeleteOptions::new("staging", 3).unwrap();

        let report = delete_products(&api, &ids(&["ZZ1", "PA1", "pa2"]), &options).await;

        assert_eq!(*api.submitted.lock().unwrap(), vec!["PA1"]);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.succeeded, 1);
    }

    #[test]
    fn test_options_reject_concurrency() {
        assert!(DeleteOptions::new("staging", 0).is_err());
        assert!(DeleteOptions::new("staging", 11).is_err());
    }

    #[tokio::test]
    async fn test_delete_from_file_writes_report_and_archives() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path().join("out"));
        let input = dir.path().join("ids.csv");
        tokio::fs::write(&input, "id\nPA1\nPA2\n").await.unwrap();
        let api = FakeProducts::with(&["PA1", "PA2"]);
        let options = DeleteOptions::new("prod", 5).unwrap();

        let outcome = delete_from_file(&api, &store, &input, &dir.path().join("archive"), &options)
            .await
            .unwrap();

        assert_eq!(outcome.report.succeeded, 2);
        let written: serde_json::Value = read_report(&outcome.report_path).await;
        assert_eq!(written["deleted"], 2);
        assert_eq!(written["environment"], "prod");
        assert!(outcome.archived.unwrap().starts_with(dir.path().join("archive")));
        assert!(!input.exists());
    }

    async fn read_report(path: &Path) -> serde_json::Value {
        crate::store::read_json_file(path).await.unwrap()
    }
}
