//! Profile and product search.
//!
//! # Usage
//!
//! ```bash
//! # Page files only
//! storeops --env staging search-products -f name --value tea
//!
//! # Merge pages, keep PA-prefixed IDs, add a CSV
//! storeops --env staging search-products -f name --value tea --consolidate --id-prefix-only --csv
//! ```

use chrono::Utc;
use storeops_admin::api::SearchResource;
use storeops_admin::consolidate::{ConsolidateOptions, DEFAULT_ID_PREFIX, IdPrefixFilter, consolidate};
use storeops_admin::search::{PaginatedFetcher, SearchSpec};
use storeops_core::query::split_field_list;

use super::Session;

/// Search options as given on the command line.
pub struct SearchArgs {
    pub field: String,
    pub value: String,
    pub fields: Option<String>,
    pub consolidate: bool,
    pub id_prefix_only: bool,
    pub csv: bool,
}

pub async fn run(
    session: &Session,
    resource: SearchResource,
    args: &SearchArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let fields = args.fields.as_deref().map(split_field_list).unwrap_or_default();
    let spec = SearchSpec::contains(resource, &args.field, &args.value, fields, session.config.page_size);

    let fetcher = PaginatedFetcher::new(&session.client, &session.store);
    let base = fetcher.run_base(resource, Utc::now()).await?;
    tracing::info!("Searching {resource} where {}", spec.query.as_deref().unwrap_or_default());

    let pages = fetcher.fetch(&spec, &base).await?;
    tracing::info!(
        "Fetched {} of {} {resource} in {} page(s)",
        pages.fetched,
        pages.total,
        pages.files.len()
    );

    if !args.consolidate {
        tracing::info!("Page files: {}_<n>.json in {}", base, session.store.root().display());
        return Ok(());
    }

    let options = ConsolidateOptions {
        env: session.env().to_string(),
        filter: args.id_prefix_only.then(|| IdPrefixFilter::new(DEFAULT_ID_PREFIX)),
        csv: args.csv,
    };
    let merged = consolidate(&session.store, &base, &options).await?;

    tracing::info!(
        "Consolidated {} page(s): {} record(s) kept of {}",
        merged.pages,
        merged.kept,
        merged.merged
    );
    tracing::info!("Result: {}", merged.json_path.display());
    if let Some(csv) = merged.csv_path {
        tracing::info!("CSV: {}", csv.display());
    }
    Ok(())
}
