//! Typed filtering of a saved record set.
//!
//! # Usage
//!
//! ```bash
//! storeops mine-result profiles_consolidated.json -f created -c "2024-01-01 2024-03-31"
//! storeops mine-result products.json -f price -c ">=25"
//! ```
//!
//! Needs no credentials; only the output directory is read from the
//! environment.

use std::path::{Path, PathBuf};

use storeops_admin::mining::mine;
use storeops_admin::{OutputConfig, OutputStore};

pub async fn run(
    output_dir: Option<PathBuf>,
    source: &Path,
    field: &str,
    condition: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output_dir.map_or_else(OutputConfig::from_env, OutputConfig::in_dir);
    let store = OutputStore::new(&output.output_dir);

    let outcome = mine(&store, source, field, condition).await?;
    let analysis = &outcome.result.field_analysis;

    tracing::info!(
        "Field '{}' inferred as {} ({})",
        analysis.field,
        analysis.field_type,
        analysis.details
    );
    tracing::info!(
        "{} of {} records match",
        outcome.result.filtered_count,
        outcome.result.original_count
    );
    tracing::info!("Result: {}", outcome.json_path.display());
    tracing::info!("CSV: {}", outcome.csv_path.display());
    Ok(())
}
