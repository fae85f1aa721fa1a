//! Bulk product deletion.
//!
//! # Usage
//!
//! ```bash
//! storeops --env prod delete-products ids.csv --concurrency 5
//! ```
//!
//! IDs without the `PA` prefix (or `--prefix`) are skipped. The input file is
//! archived afterwards so it is not processed twice.

use std::path::Path;

use storeops_admin::products::{DeleteOptions, delete_from_file};

use super::Session;

pub async fn delete(
    session: &Session,
    input: &Path,
    concurrency: usize,
    prefix: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = DeleteOptions::new(session.env(), concurrency)?;
    options.required_prefix = prefix;

    let outcome = delete_from_file(
        &session.client,
        &session.store,
        input,
        &session.config.output.archive_dir,
        &options,
    )
    .await?;

    let report = &outcome.report;
    tracing::info!(
        "Deleted {} of {} product(s): {} failed, {} skipped",
        report.succeeded,
        report.total,
        report.failed,
        report.skipped
    );
    let not_found = report.not_found_count();
    if not_found > 0 {
        tracing::warn!("{not_found} product(s) were already gone (404)");
    }
    for failure in report.errors.iter().filter(|e| !e.is_not_found()) {
        tracing::error!("{}: {}", failure.id, failure.error);
    }
    tracing::info!("Report: {}", outcome.report_path.display());

    match &outcome.archived {
        Ok(path) => tracing::info!("Input archived to {}", path.display()),
        Err(e) => tracing::warn!("Input file was not archived: {e}"),
    }
    Ok(())
}
