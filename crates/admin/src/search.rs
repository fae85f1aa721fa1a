//! Offset-paginated search with one file per page.
//!
//! Pages are requested strictly in offset order and each is written to
//! `<base>_<page>.json` before the next request, so a crash loses at most
//! the page in flight.

use std::time::Duration;

use chrono::{DateTime, Utc};
use storeops_core::naming::{date_fragment, page_file_name};
use storeops_core::query::contains_query;
use thiserror::Error;
use tracing::{info, instrument};

use crate::api::{ApiError, SearchApi, SearchRequest, SearchResource};
use crate::store::{OutputStore, StoreError};

/// Pause between consecutive page requests.
pub const PAGE_DELAY: Duration = Duration::from_millis(100);

/// Errors that abort a paginated search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSpec {
    pub resource: SearchResource,
    pub query: Option<String>,
    pub fields: Vec<String>,
    pub page_size: u32,
}

impl SearchSpec {
    /// Search where `field` contains `value`.
    #[must_use]
    pub fn contains(
        resource: SearchResource,
        field: &str,
        value: &str,
        fields: Vec<String>,
        page_size: u32,
    ) -> Self {
        Self {
            resource,
            query: Some(contains_query(field, value)),
            fields,
            page_size,
        }
    }

    fn page(&self, offset: u64) -> SearchRequest {
        SearchRequest {
            resource: self.resource,
            query: self.query.clone(),
            fields: self.fields.clone(),
            offset,
            limit: self.page_size,
        }
    }
}

/// Pages written by one search run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPages {
    /// Run base name shared by the page files.
    pub base: String,
    /// Page file names, in page order.
    pub files: Vec<String>,
    /// Items received across all pages.
    pub fetched: u64,
    /// Total reported by the last page.
    pub total: u64,
}

/// Drives offset pagination against a [`SearchApi`].
pub struct PaginatedFetcher<'a, A> {
    api: &'a A,
    store: &'a OutputStore,
    delay: Duration,
}

impl<'a, A: SearchApi> PaginatedFetcher<'a, A> {
    #[must_use]
    pub const fn new(api: &'a A, store: &'a OutputStore) -> Self {
        Self {
            api,
            store,
            delay: PAGE_DELAY,
        }
    }

    /// Override the pause between pages.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fresh run base for a search started at `now`: `<resource>_<date>`,
    /// with a counter when that base is already in use.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the output directory cannot be listed.
    pub async fn run_base(&self, resource: SearchResource, now: DateTime<Utc>) -> Result<String, StoreError> {
        self.store
            .run_base(&format!("{resource}_{}", date_fragment(now)))
            .await
    }

    /// Fetch every page of `spec`, writing each under `base`.
    ///
    /// Stops once the items received reach the reported total, or when a
    /// page comes back shorter than the page size.
    ///
    /// # Errors
    ///
    /// Returns `SearchError` on the first failed request or write. Pages
    /// already written stay on disk.
    #[instrument(skip(self, spec), fields(resource = %spec.resource, base = %base))]
    pub async fn fetch(&self, spec: &SearchSpec, base: &str) -> Result<FetchedPages, SearchError> {
        let page_size = u64::from(spec.page_size);
        let mut pages = FetchedPages {
            base: base.to_string(),
            files: Vec::new(),
            fetched: 0,
            total: 0,
        };
        let mut offset = 0;
        let mut page = 1;

        loop {
            if page > 1 {
                tokio::time::sleep(self.delay).await;
            }

            let result = self.api.search(&spec.page(offset)).await?;
            let count = result.len() as u64;

            let name = page_file_name(base, page);
            self.store.write_json(&name, &result.raw).await?;
            info!(page, count, total = result.total, file = %name, "Saved page");

            pages.files.push(name);
            pages.fetched += count;
            pages.total = result.total;

            if pages.fetched >= pages.total || count < page_size {
                break;
            }
            offset += page_size;
            page += 1;
        }

        info!(
            pages = pages.files.len(),
            fetched = pages.fetched,
            total = pages.total,
            "Search complete"
        );
        Ok(pages)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{Value, json};

    use super::*;
    use crate::api::SearchPage;

    /// Serves `total` items in `page_size` pages and records requested offsets.
    struct FakeSearch {
        total: u64,
        reported_total: u64,
        offsets: Mutex<Vec<u64>>,
        fail_at: Option<u64>,
    }

    impl FakeSearch {
        fn new(total: u64) -> Self {
            Self {
                total,
                reported_total: total,
                offsets: Mutex::new(Vec::new()),
                fail_at: None,
            }
        }
    }

    impl SearchApi for FakeSearch {
        async fn search(&self, request: &SearchRequest) -> Result<SearchPage, ApiError> {
            self.offsets.lock().unwrap().push(request.offset);
            if self.fail_at == Some(request.offset) {
                return Err(ApiError::Status {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            let end = (request.offset + u64::from(request.limit)).min(self.total);
            let items: Vec<Value> = (request.offset..end).map(|i| json!({"id": format!("PA{i}")})).collect();
            SearchPage::from_body(json!({"total": self.reported_total, "items": items}))
        }
    }

    fn spec(page_size: u32) -> SearchSpec {
        SearchSpec::contains(SearchResource::Products, "name", "tea", vec!["id".to_string()], page_size)
    }

    #[test]
    fn test_contains_spec_renders_query() {
        assert_eq!(spec(10).query.as_deref(), Some(r#"name co "tea""#));
    }

    #[tokio::test]
    async fn test_fetch_writes_one_file_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let api = FakeSearch::new(25);

        let fetcher = PaginatedFetcher::new(&api, &store).with_delay(Duration::ZERO);
        let pages = fetcher.fetch(&spec(10), "products_20240101").await.unwrap();

        assert_eq!(pages.fetched, 25);
        assert_eq!(
            pages.files,
            vec!["products_20240101_1.json", "products_20240101_2.json", "products_20240101_3.json"]
        );
        assert_eq!(*api.offsets.lock().unwrap(), vec![0, 10, 20]);

        let last: Value = store.read_json("products_20240101_3.json").await.unwrap();
        assert_eq!(last["items"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_fetch_stops_at_reported_total() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let api = FakeSearch::new(20);

        let fetcher = PaginatedFetcher::new(&api, &store).with_delay(Duration::ZERO);
        let pages = fetcher.fetch(&spec(10), "run").await.unwrap();

        // Exact multiple: no empty trailing request
        assert_eq!(pages.files.len(), 2);
        assert_eq!(*api.offsets.lock().unwrap(), vec![0, 10]);
    }

    #[tokio::test]
    async fn test_fetch_stops_on_short_page_despite_stale_total() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let mut api = FakeSearch::new(15);
        api.reported_total = 100;

        let fetcher = PaginatedFetcher::new(&api, &store).with_delay(Duration::ZERO);
        let pages = fetcher.fetch(&spec(10), "run").await.unwrap();

        assert_eq!(pages.fetched, 15);
        assert_eq!(pages.total, 100);
        assert_eq!(pages.files.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_written_pages() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let mut api = FakeSearch::new(30);
        api.fail_at = Some(20);

        let fetcher = PaginatedFetcher::new(&api, &store).with_delay(Duration::ZERO);
        let err = fetcher.fetch(&spec(10), "run").await.unwrap_err();

        assert!(matches!(err, SearchError::Api(_)));
        assert_eq!(store.list().await.unwrap(), vec!["run_1.json", "run_2.json"]);
    }

    #[tokio::test]
    async fn test_run_base_skips_used_base() {
        use chrono::TimeZone;

        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        store.write_text("profiles_20240105_1.json", "{}").await.unwrap();
        let api = FakeSearch::new(0);
        let fetcher = PaginatedFetcher::new(&api, &store);
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap();

        assert_eq!(
            fetcher.run_base(SearchResource::Profiles, now).await.unwrap(),
            "profiles_20240105(1)"
        );
        assert_eq!(
            fetcher.run_base(SearchResource::Products, now).await.unwrap(),
            "products_20240105"
        );
    }
}
