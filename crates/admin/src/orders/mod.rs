//! Order reads: counts, oldest order, bulk fetch by ID, resumable listing.

pub mod fetch;
pub mod listing;

pub use fetch::{FetchOptions, FetchOutcome, fetch_from_file, fetch_orders};
pub use listing::{ListingOptions, ListingOutcome, OrderListError, ResumableListFetcher, RetryPolicy};

use storeops_core::Record;
use tracing::instrument;

use crate::api::{ApiError, OrderApi, OrderListRequest, SortOrder};

/// Field the API sorts orders by creation time on.
pub const CREATION_DATE_FIELD: &str = "creation_date";

/// Number of orders matching `query` (all orders when `None`).
///
/// Requests a single-item page and reads the reported total.
///
/// # Errors
///
/// Returns `ApiError` if the request fails.
#[instrument(skip(api))]
pub async fn count_orders<A: OrderApi>(api: &A, query: Option<String>) -> Result<u64, ApiError> {
    let page = api
        .list_orders(&OrderListRequest {
            query,
            limit: 1,
            ..OrderListRequest::default()
        })
        .await?;
    Ok(page.total)
}

/// The order with the earliest creation date, if any orders exist.
///
/// # Errors
///
/// Returns `ApiError` if the request fails.
#[instrument(skip(api))]
pub async fn oldest_order<A: OrderApi>(api: &A) -> Result<Option<Record>, ApiError> {
    let page = api
        .list_orders(&OrderListRequest {
            sort_by: Some(CREATION_DATE_FIELD.to_string()),
            sort_order: Some(SortOrder::Asc),
            limit: 1,
            ..OrderListRequest::default()
        })
        .await?;
    Ok(page.items.into_iter().next())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::api::SearchPage;

    #[derive(Default)]
    struct RecordingOrders {
        requests: Mutex<Vec<OrderListRequest>>,
    }

    impl OrderApi for RecordingOrders {
        async fn get_order(&self, id: &str, _fields: &[String]) -> Result<Record, ApiError> {
            Err(ApiError::NotFound(id.to_string()))
        }

        async fn list_orders(&self, request: &OrderListRequest) -> Result<SearchPage, ApiError> {
            self.requests.lock().unwrap().push(request.clone());
            SearchPage::from_body(json!({
                "total": 4213,
                "items": [{"id": "OR1", "creation_date": "2019-03-01T10:00:00Z"}]
            }))
        }
    }

    #[tokio::test]
    async fn test_count_orders_reads_total() {
        let api = RecordingOrders::default();
        let count = count_orders(&api, Some("status eq \"open\"".to_string())).await.unwrap();

        assert_eq!(count, 4213);
        let requests = api.requests.lock().unwrap();
        let request = requests.first().unwrap();
        assert_eq!(request.limit, 1);
        assert_eq!(request.query.as_deref(), Some("status eq \"open\""));
    }

    #[tokio::test]
    async fn test_oldest_order_sorts_ascending() {
        let api = RecordingOrders::default();
        let order = oldest_order(&api).await.unwrap().unwrap();

        assert_eq!(order["id"], "OR1");
        let requests = api.requests.lock().unwrap();
        let request = requests.first().unwrap();
        assert_eq!(request.sort_by.as_deref(), Some("creation_date"));
        assert_eq!(request.sort_order, Some(SortOrder::Asc));
        assert_eq!(request.limit, 1);
    }
}
