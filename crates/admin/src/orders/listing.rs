//! Resumable order listing.
//!
//! Walks the order listing page by page, appending projected rows to one
//! CSV file. After every appended page a [`PaginationCheckpoint`] is saved;
//! when a page keeps failing the run stops and the next invocation resumes
//! from that checkpoint instead of starting over.
//!
//! The checkpoint is written after the append. A crash between the two
//! repeats the last page's rows on resume.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use storeops_core::naming::timestamp_fragment;
use storeops_core::tabular::{TabularError, to_delimited_rows};
use storeops_core::{PaginationCheckpoint, Record, lookup_path};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::api::{ApiError, OrderApi, OrderListRequest, SearchPage, SortOrder};
use crate::search::PAGE_DELAY;
use crate::store::{OutputStore, StoreError, append_file};

/// Checkpoint file name inside the output directory.
pub const CHECKPOINT_FILE: &str = "order_listing_checkpoint.json";

/// Errors that end a listing run.
#[derive(Debug, Error)]
pub enum OrderListError {
    /// A page kept failing. The checkpoint is saved; run again to resume.
    #[error("Page {page} failed after {attempts} attempts ({source}); progress saved to {}", .checkpoint.display())]
    Resumable {
        page: u64,
        attempts: u32,
        checkpoint: PathBuf,
        #[source]
        source: ApiError,
    },

    #[error("At least one output column is required")]
    NoColumns,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("CSV export failed: {0}")]
    Tabular(#[from] TabularError),
}

/// Retry schedule for a single page.
///
/// The wait after failed attempt `n` is `base_delay * 2^(n-1)`: 3 s, 6 s,
/// 12 s, 24 s with the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// Retry without waiting.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    /// Wait after failed attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// What to list and how to write it.
#[derive(Debug, Clone)]
pub struct ListingOptions {
    pub query: Option<String>,
    pub query_format: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    /// Output columns; dotted paths reach into nested objects.
    pub columns: Vec<String>,
    pub page_size: u32,
}

impl ListingOptions {
    fn request(&self, offset: u64) -> OrderListRequest {
        OrderListRequest {
            query: self.query.clone(),
            query_format: self.query_format.clone(),
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order,
            limit: self.page_size,
            offset,
        }
    }
}

/// Result of a completed listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingOutcome {
    pub output_path: PathBuf,
    pub fetched: u64,
    pub total: u64,
    /// Pages requested by this invocation.
    pub pages: u64,
    /// Whether the run continued from a checkpoint.
    pub resumed: bool,
}

/// Keep only `columns` of `record`, keyed by column name.
#[must_use]
pub fn project(record: &Record, columns: &[String]) -> Record {
    columns
        .iter()
        .filter_map(|column| {
            record
                .get(column)
                .or_else(|| lookup_path(record, column))
                .map(|value| (column.clone(), value.clone()))
        })
        .collect()
}

/// Paginated order listing with checkpoint and retry.
pub struct ResumableListFetcher<'a, A> {
    api: &'a A,
    store: &'a OutputStore,
    retry: RetryPolicy,
    delay: Duration,
}

impl<'a, A: OrderApi> ResumableListFetcher<'a, A> {
    #[must_use]
    pub fn new(api: &'a A, store: &'a OutputStore) -> Self {
        Self {
            api,
            store,
            retry: RetryPolicy::default(),
            delay: PAGE_DELAY,
        }
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the pause between pages.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Run (or resume) the listing.
    ///
    /// # Errors
    ///
    /// Returns `OrderListError::Resumable` when a page exhausts its
    /// retries; the checkpoint stays on disk. Store and CSV errors abort
    /// without touching the checkpoint.
    #[instrument(skip(self, options), fields(page_size = options.page_size))]
    pub async fn run(&self, options: &ListingOptions) -> Result<ListingOutcome, OrderListError> {
        if options.columns.is_empty() {
            return Err(OrderListError::NoColumns);
        }

        let (mut checkpoint, resumed) = self.start().await?;
        let output_path = PathBuf::from(&checkpoint.output_path);
        if !resumed {
            let header = to_delimited_rows(&options.columns, &[], true)?;
            append_file(&output_path, &header).await?;
        }

        let page_size = u64::from(options.page_size);
        let mut pages = 0;

        loop {
            if pages > 0 {
                tokio::time::sleep(self.delay).await;
            }

            let page = match self.fetch_page(&options.request(checkpoint.offset)).await {
                Ok(page) => page,
                Err((attempts, source)) => {
                    let path = self.store.write_json(CHECKPOINT_FILE, &checkpoint).await?;
                    return Err(OrderListError::Resumable {
                        page: checkpoint.page,
                        attempts,
                        checkpoint: path,
                        source,
                    });
                }
            };
            pages += 1;

            let count = page.len() as u64;
            let projected: Vec<Record> = page
                .items
                .iter()
                .map(|record| project(record, &options.columns))
                .collect();
            append_file(&output_path, &to_delimited_rows(&options.columns, &projected, false)?).await?;

            info!(
                page = checkpoint.page,
                offset = checkpoint.offset,
                count,
                total = page.total,
                "Appended page"
            );
            checkpoint.advance(count, page.total);
            self.store.write_json(CHECKPOINT_FILE, &checkpoint).await?;

            if checkpoint.fetched >= checkpoint.total || count < page_size {
                break;
            }
        }

        self.store.remove(CHECKPOINT_FILE).await?;
        info!(
            fetched = checkpoint.fetched,
            total = checkpoint.total,
            file = %output_path.display(),
            "Listing complete"
        );

        Ok(ListingOutcome {
            output_path,
            fetched: checkpoint.fetched,
            total: checkpoint.total,
            pages,
            resumed,
        })
    }

    /// Load the checkpoint, or start fresh with a new output file.
    async fn start(&self) -> Result<(PaginationCheckpoint, bool), StoreError> {
        if let Some(checkpoint) = self
            .store
            .read_json_opt::<PaginationCheckpoint>(CHECKPOINT_FILE)
            .await?
        {
            info!(
                page = checkpoint.page,
                offset = checkpoint.offset,
                fetched = checkpoint.fetched,
                file = %checkpoint.output_path,
                "Resuming from checkpoint"
            );
            return Ok((checkpoint, true));
        }

        self.store.ensure_dir().await?;
        let stem = format!("orders_list_{}", timestamp_fragment(Utc::now()));
        let name = self.store.unique_name(&stem, "csv").await?;
        let path = self.store.path(&name);
        Ok((PaginationCheckpoint::fresh(path_text(&path)), false))
    }

    /// Request one page, retrying per the policy.
    async fn fetch_page(&self, request: &OrderListRequest) -> Result<SearchPage, (u32, ApiError)> {
        let mut attempt = 1;
        loop {
            match self.api.list_orders(request).await {
                Ok(page) => return Ok(page),
                Err(e) if attempt < self.retry.max_attempts => {
                    let mut wait = self.retry.delay_after(attempt);
                    if let ApiError::RateLimited(secs) = &e {
                        wait = wait.max(Duration::from_secs(*secs));
                    }
                    warn!(
                        attempt,
                        offset = request.offset,
                        wait_secs = wait.as_secs(),
                        error = %e,
                        "Page request failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err((attempt, e)),
            }
        }
    }
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use serde_json::{Value, json};

    use super::*;

    /// `total` orders; fails every request at `fail_offset` while
    /// `failures_left` is non-zero.
    struct FlakyOrders {
        total: u64,
        fail_offset: Option<u64>,
        failures_left: AtomicU32,
        offsets: Mutex<Vec<u64>>,
    }

    impl FlakyOrders {
        fn new(total: u64, fail_offset: Option<u64>, failures: u32) -> Self {
            Self {
                total,
                fail_offset,
                failures_left: AtomicU32::new(failures),
                offsets: Mutex::new(Vec::new()),
            }
        }
    }

    impl OrderApi for FlakyOrders {
        async fn get_order(&self, id: &str, _fields: &[String]) -> Result<Record, ApiError> {
            Err(ApiError::NotFound(id.to_string()))
        }

        async fn list_orders(&self, request: &OrderListRequest) -> Result<SearchPage, ApiError> {
            self.offsets.lock().unwrap().push(request.offset);
            if self.fail_offset == Some(request.offset)
                && self
                    .failures_left
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            {
                return Err(ApiError::Status {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            let end = (request.offset + u64::from(request.limit)).min(self.total);
            let items: Vec<Value> = (request.offset..end)
                .map(|i| json!({"id": format!("OR{i}"), "status": "open", "customer": {"email": format!("c{i}@x.io")}}))
                .collect();
            SearchPage::from_body(json!({"total": self.total, "items": items}))
        }
    }

    fn options() -> ListingOptions {
        ListingOptions {
            query: None,
            query_format: None,
            sort_by: Some("creation_date".to_string()),
            sort_order: Some(SortOrder::Asc),
            columns: vec!["id".to_string(), "customer.email".to_string()],
            page_size: 2,
        }
    }

    #[test]
    fn test_retry_delays_double() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=4).map(|n| policy.delay_after(n).as_secs()).collect();
        assert_eq!(delays, vec![3, 6, 12, 24]);
    }

    #[test]
    fn test_project_resolves_paths() {
        let record = json!({"id": "OR1", "customer": {"email": "a@b.c"}, "extra": 1});
        let projected = project(record.as_object().unwrap(), &["id".to_string(), "customer.email".to_string()]);
        assert_eq!(Value::Object(projected), json!({"id": "OR1", "customer.email": "a@b.c"}));
    }

    #[tokio::test]
    async fn test_listing_completes_and_removes_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let api = FlakyOrders::new(5, Some(2), 2);

        let outcome = ResumableListFetcher::new(&api, &store)
            .with_retry(RetryPolicy::immediate(5))
            .with_delay(Duration::ZERO)
            .run(&options())
            .await
            .unwrap();

        assert_eq!(outcome.fetched, 5);
        assert_eq!(outcome.pages, 3);
        assert!(!outcome.resumed);
        assert!(!store.exists(CHECKPOINT_FILE).await);

        let csv = tokio::fs::read_to_string(&outcome.output_path).await.unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.first(), Some(&"id,customer.email"));
        assert_eq!(lines.len(), 6);
        assert_eq!(lines.last(), Some(&"OR4,c4@x.io"));
        // Two failures then success at offset 2
        assert_eq!(*api.offsets.lock().unwrap(), vec![0, 2, 2, 2, 4]);
    }

    #[tokio::test]
    async fn test_exhausted_retries_save_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let api = FlakyOrders::new(6, Some(2), 10);

        let err = ResumableListFetcher::new(&api, &store)
            .with_retry(RetryPolicy::immediate(3))
            .with_delay(Duration::ZERO)
            .run(&options())
            .await
            .unwrap_err();

        assert!(matches!(err, OrderListError::Resumable { page: 2, attempts: 3, .. }));
        let checkpoint: PaginationCheckpoint = store.read_json(CHECKPOINT_FILE).await.unwrap();
        assert_eq!(checkpoint.offset, 2);
        assert_eq!(checkpoint.fetched, 2);
        assert_eq!(checkpoint.page, 2);
        assert_eq!(checkpoint.total, 6);
    }

    #[tokio::test]
    async fn test_listing_requires_columns() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let api = FlakyOrders::new(1, None, 0);
        let mut opts = options();
        opts.columns.clear();

        let err = ResumableListFetcher::new(&api, &store).run(&opts).await.unwrap_err();
        assert!(matches!(err, OrderListError::NoColumns));
    }
}
