//! Bulk fetch of orders by ID.

use std::path::{Path, PathBuf};

use chrono::Utc;
use storeops_core::naming::timestamp_fragment;
use storeops_core::tabular::to_delimited_text;
use storeops_core::{BulkOperation, BulkReport, Record, RecordSet};
use tracing::{error, info, instrument, warn};

use crate::api::OrderApi;
use crate::bulk::{BulkError, archive_or_warn, read_id_list, run_in_batches, validate_concurrency, write_report};
use crate::store::OutputStore;

/// Settings for a fetch run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub environment: String,
    pub concurrency: usize,
    /// Fields to request for each order; empty means the full order.
    pub fields: Vec<String>,
}

impl FetchOptions {
    /// # Errors
    ///
    /// Returns `BulkError::InvalidConcurrency` outside `1..=10`.
    pub fn new(environment: impl Into<String>, concurrency: usize, fields: Vec<String>) -> Result<Self, BulkError> {
        Ok(Self {
            environment: environment.into(),
            concurrency: validate_concurrency(concurrency)?,
            fields,
        })
    }
}

/// Everything a file-driven fetch run produced.
#[derive(Debug)]
pub struct FetchOutcome {
    pub report: BulkReport,
    pub report_path: PathBuf,
    /// Fetched orders as JSON; `None` when nothing was fetched.
    pub json_path: Option<PathBuf>,
    pub csv_path: Option<PathBuf>,
    pub archived: Result<PathBuf, String>,
}

/// Fetch each of `ids`, returning the report and the orders in input order.
#[instrument(skip(api, ids, options), fields(count = ids.len(), concurrency = options.concurrency))]
pub async fn fetch_orders<A: OrderApi>(api: &A, ids: &[String], options: &FetchOptions) -> (BulkReport, Vec<Record>) {
    let mut report = BulkReport::start(
        BulkOperation::Fetch,
        options.environment.clone(),
        ids.len(),
        options.concurrency,
    );

    let outcomes = run_in_batches(ids, options.concurrency, |id| async move {
        (id.as_str(), api.get_order(id, &options.fields).await)
    })
    .await;

    let mut orders = Vec::new();
    for (id, outcome) in outcomes {
        match outcome {
            Ok(order) => {
                info!(id, "Fetched order");
                report.record_success();
                orders.push(order);
            }
            Err(e) => {
                if e.is_not_found() {
                    warn!(id, "Order not found");
                } else {
                    error!(id, error = %e, "Failed to fetch order");
                }
                report.record_failure(id, e.to_string(), e.status_code());
            }
        }
    }

    report.finish();
    (report, orders)
}

/// Fetch every order listed in `input` and write orders, CSV and report.
///
/// # Errors
///
/// Returns `BulkError` if the list cannot be read or an output file cannot
/// be written. Per-ID failures are recorded in the report.
pub async fn fetch_from_file<A: OrderApi>(
    api: &A,
    store: &OutputStore,
    input: &Path,
    archive_dir: &Path,
    options: &FetchOptions,
) -> Result<FetchOutcome, BulkError> {
    let ids = read_id_list(input).await?;
    info!(file = %input.display(), count = ids.len(), "Loaded IDs");

    let (report, orders) = fetch_orders(api, &ids, options).await;

    let (json_path, csv_path) = if orders.is_empty() {
        warn!("No orders fetched, skipping order output");
        (None, None)
    } else {
        let stem = format!("orders_{}", timestamp_fragment(Utc::now()));
        let csv = to_delimited_text(&orders)?;
        let mut set = RecordSet::new(options.environment.clone(), orders.len() as u64, orders);
        set.source = input.file_name().and_then(|n| n.to_str()).map(str::to_string);

        let json_name = store.unique_name(&stem, "json").await?;
        let json_path = store.write_json(&json_name, &set).await?;
        let csv_name = store.unique_name(&stem, "csv").await?;
        let csv_path = store.write_text(&csv_name, &csv).await?;
        (Some(json_path), Some(csv_path))
    };

    let report_path = write_report(store, "fetch", &report).await?;
    let archived = archive_or_warn(input, archive_dir).await;

    Ok(FetchOutcome {
        report,
        report_path,
        json_path,
        csv_path,
        archived,
    })
}
