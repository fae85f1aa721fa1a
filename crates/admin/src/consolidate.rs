//! Merge a run's page files into one record set.
//!
//! Consolidation is destructive: once the merged file is written, the page
//! files it was built from are deleted.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use storeops_core::naming::page_number;
use storeops_core::tabular::{TabularError, to_delimited_text};
use storeops_core::{Record, RecordSet};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::store::{OutputStore, StoreError};

/// Default prefix for product IDs.
pub const DEFAULT_ID_PREFIX: &str = "PA";

/// Errors that can occur while consolidating.
#[derive(Debug, Error)]
pub enum ConsolidateError {
    #[error("No page files found for {0}")]
    NoPages(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("CSV export failed: {0}")]
    Tabular(#[from] TabularError),
}

/// Keeps only records whose `id` starts with a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPrefixFilter {
    prefix: String,
}

impl IdPrefixFilter {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether `record` has a string `id` starting with the prefix.
    #[must_use]
    pub fn keeps(&self, record: &Record) -> bool {
        record
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|id| id.starts_with(&self.prefix))
    }

    #[must_use]
    pub fn describe(&self) -> String {
        format!("id starts with {}", self.prefix)
    }
}

/// How to consolidate a run.
#[derive(Debug, Clone, Default)]
pub struct ConsolidateOptions {
    /// Environment recorded in the merged file.
    pub env: String,
    pub filter: Option<IdPrefixFilter>,
    /// Also write a CSV of the merged items.
    pub csv: bool,
}

/// Result of a consolidation.
#[derive(Debug, Clone)]
pub struct Consolidated {
    pub json_path: PathBuf,
    pub csv_path: Option<PathBuf>,
    /// Number of page files merged (and removed).
    pub pages: usize,
    /// Items across all pages, before filtering.
    pub merged: usize,
    /// Items written.
    pub kept: usize,
}

/// Shape of a page file. Extra upstream metadata is ignored.
#[derive(Deserialize)]
struct PageFile {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    items: Vec<Value>,
}

/// Merge every `<base>_<n>.json` page in `store`.
///
/// Pages are merged in ascending `n` order. The merged set is written to
/// `<base>_consolidated.json`, then the page files are removed.
///
/// # Errors
///
/// Returns `ConsolidateError::NoPages` if no page file exists for `base`,
/// or a store/CSV error. Page files are only removed after every output
/// file is written.
#[instrument(skip(store, options), fields(base = %base))]
pub async fn consolidate(
    store: &OutputStore,
    base: &str,
    options: &ConsolidateOptions,
) -> Result<Consolidated, ConsolidateError> {
    let mut pages: Vec<(u64, String)> = store
        .list()
        .await?
        .into_iter()
        .filter_map(|name| page_number(base, &name).map(|n| (n, name)))
        .collect();
    if pages.is_empty() {
        return Err(ConsolidateError::NoPages(base.to_string()));
    }
    pages.sort_by_key(|(n, _)| *n);

    let mut items: Vec<Record> = Vec::new();
    let mut reported_total = 0;
    for (_, name) in &pages {
        let page: PageFile = store.read_json(name).await?;
        reported_total = reported_total.max(page.total);
        for item in page.items {
            match item {
                Value::Object(record) => items.push(record),
                other => warn!(file = %name, item = %other, "Skipping non-object item"),
            }
        }
    }

    let merged = items.len();
    if merged as u64 != reported_total {
        warn!(
            merged,
            reported_total, "Merged item count differs from reported total"
        );
    }

    let mut set = match &options.filter {
        Some(filter) => {
            items.retain(|record| filter.keeps(record));
            let kept = items.len() as u64;
            let mut set = RecordSet::new(options.env.clone(), kept, items);
            set.filter = Some(filter.describe());
            set
        }
        None => RecordSet::new(options.env.clone(), reported_total, items),
    };
    set.source = Some(base.to_string());
    let kept = set.len();

    let stem = format!("{base}_consolidated");
    let json_name = store.unique_name(&stem, "json").await?;
    let json_path = store.write_json(&json_name, &set).await?;

    let csv_path = if options.csv {
        let csv_name = store.unique_name(&stem, "csv").await?;
        Some(store.write_text(&csv_name, &to_delimited_text(&set.items)?).await?)
    } else {
        None
    };

    for (_, name) in &pages {
        store.remove(name).await?;
    }

    info!(
        pages = pages.len(),
        merged,
        kept,
        file = %json_path.display(),
        "Consolidated pages"
    );

    Ok(Consolidated {
        json_path,
        csv_path,
        pages: pages.len(),
        merged,
        kept,
    })
}
