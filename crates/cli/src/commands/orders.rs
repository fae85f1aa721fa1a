//! Order commands.
//!
//! # Usage
//!
//! ```bash
//! storeops --env prod count-orders -q 'status eq "open"'
//! storeops --env prod oldest-order
//! storeops --env prod search-orders order_ids.csv --fields id,status
//! storeops --env prod list-orders --columns id,status,customer_info.email
//! ```

use std::path::Path;

use storeops_admin::api::SortOrder;
use storeops_admin::orders::{
    FetchOptions, ListingOptions, OrderListError, ResumableListFetcher, count_orders, fetch_from_file,
    oldest_order,
};
use storeops_core::query::split_field_list;

use super::Session;

/// `list-orders` options as given on the command line.
pub struct ListArgs {
    pub columns: String,
    pub query: Option<String>,
    pub query_format: Option<String>,
    pub sort_by: String,
    pub desc: bool,
}

pub async fn count(session: &Session, query: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let total = count_orders(&session.client, query).await?;
    tracing::info!("{total} order(s) in {}", session.env());
    Ok(())
}

pub async fn oldest(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    match oldest_order(&session.client).await? {
        Some(order) => {
            let text = serde_json::to_string_pretty(&order)?;
            tracing::info!("Oldest order:\n{text}");
        }
        None => tracing::info!("No orders in {}", session.env()),
    }
    Ok(())
}

pub async fn fetch(
    session: &Session,
    input: &Path,
    concurrency: usize,
    fields: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let fields = fields.map(split_field_list).unwrap_or_default();
    let options = FetchOptions::new(session.env(), concurrency, fields)?;

    let outcome = fetch_from_file(
        &session.client,
        &session.store,
        input,
        &session.config.output.archive_dir,
        &options,
    )
    .await?;

    let report = &outcome.report;
    tracing::info!(
        "Fetched {} of {} order(s): {} failed",
        report.succeeded,
        report.total,
        report.failed
    );
    if let Some(path) = &outcome.json_path {
        tracing::info!("Orders: {}", path.display());
    }
    if let Some(path) = &outcome.csv_path {
        tracing::info!("CSV: {}", path.display());
    }
    tracing::info!("Report: {}", outcome.report_path.display());
    if let Err(e) = &outcome.archived {
        tracing::warn!("Input file was not archived: {e}");
    }
    Ok(())
}

pub async fn list(session: &Session, args: ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = ListingOptions {
        query: args.query,
        query_format: args.query_format,
        sort_by: Some(args.sort_by),
        sort_order: Some(if args.desc { SortOrder::Desc } else { SortOrder::Asc }),
        columns: split_field_list(&args.columns),
        page_size: session.config.page_size,
    };

    let fetcher = ResumableListFetcher::new(&session.client, &session.store);
    match fetcher.run(&options).await {
        Ok(outcome) => {
            if outcome.resumed {
                tracing::info!("Resumed from checkpoint");
            }
            tracing::info!(
                "Listed {} of {} order(s) to {}",
                outcome.fetched,
                outcome.total,
                outcome.output_path.display()
            );
            Ok(())
        }
        Err(e @ OrderListError::Resumable { .. }) => {
            tracing::warn!("Run the same command again to continue from the saved checkpoint");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
