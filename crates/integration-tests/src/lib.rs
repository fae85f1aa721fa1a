//! Integration tests for storeops.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storeops-integration-tests
//! ```
//!
//! No network is needed: [`FakeCommerce`] implements the admin API
//! capability traits over an in-memory record list, and every scenario
//! writes into its own temporary directory.
//!
//! # Test Categories
//!
//! - `mining` - End-to-end data mining and condition totality
//! - `search` - Paginated search and consolidation
//! - `bulk` - Bulk delete and fetch
//! - `listing` - Resumable order listing
//! - `tabular` - CSV round trips

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Value, json};
use storeops_admin::api::{
    ApiError, OrderApi, OrderListRequest, ProductApi, SearchApi, SearchPage, SearchRequest,
};
use storeops_core::Record;

/// In-memory stand-in for the admin API.
///
/// Search and order listing page over the same record list. Deletion
/// removes IDs from a set of existing products.
#[derive(Default)]
pub struct FakeCommerce {
    records: Vec<Record>,
    products: Mutex<HashSet<String>>,
    deleted: Mutex<Vec<String>>,
    requested_offsets: Mutex<Vec<u64>>,
    fail_offset: Mutex<Option<u64>>,
    outage: AtomicBool,
}

impl FakeCommerce {
    /// `count` records with IDs `<prefix>0`, `<prefix>1`, ...
    #[must_use]
    pub fn with_records(prefix: &str, count: usize) -> Self {
        let records = (0..count)
            .filter_map(|i| {
                json!({
                    "id": format!("{prefix}{i}"),
                    "status": if i % 2 == 0 { "open" } else { "closed" },
                    "customer_info": {"email": format!("customer{i}@example.com")}
                })
                .as_object()
                .cloned()
            })
            .collect();
        Self {
            records,
            ..Self::default()
        }
    }

    /// Products that exist and can be deleted.
    #[must_use]
    pub fn with_products(ids: &[&str]) -> Self {
        Self {
            products: Mutex::new(ids.iter().map(|id| (*id).to_string()).collect()),
            ..Self::default()
        }
    }

    /// Fail every listing request at `offset` until [`FakeCommerce::recover`].
    pub fn fail_listing_at(&self, offset: u64) {
        *lock(&self.fail_offset) = Some(offset);
        self.outage.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.outage.store(false, Ordering::SeqCst);
    }

    /// Offsets requested so far, in order.
    #[must_use]
    pub fn requested_offsets(&self) -> Vec<u64> {
        lock(&self.requested_offsets).clone()
    }

    pub fn clear_requests(&self) {
        lock(&self.requested_offsets).clear();
    }

    /// IDs submitted for deletion, in submission order.
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        lock(&self.deleted).clone()
    }

    fn page(&self, offset: u64, limit: u32) -> Result<SearchPage, ApiError> {
        lock(&self.requested_offsets).push(offset);
        if self.outage.load(Ordering::SeqCst) && *lock(&self.fail_offset) == Some(offset) {
            return Err(ApiError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }

        let items: Vec<Value> = self
            .records
            .iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .cloned()
            .map(Value::Object)
            .collect();
        SearchPage::from_body(json!({
            "total": self.records.len(),
            "offset": offset,
            "items": items
        }))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl SearchApi for FakeCommerce {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, ApiError> {
        self.page(request.offset, request.limit)
    }
}

impl ProductApi for FakeCommerce {
    async fn delete_product(&self, id: &str) -> Result<(), ApiError> {
        lock(&self.deleted).push(id.to_string());
        if lock(&self.products).remove(id) {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!("/products/{id}")))
        }
    }
}

impl OrderApi for FakeCommerce {
    async fn get_order(&self, id: &str, _fields: &[String]) -> Result<Record, ApiError> {
        self.records
            .iter()
            .find(|record| record.get("id").and_then(Value::as_str) == Some(id))
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("/orders/{id}")))
    }

    async fn list_orders(&self, request: &OrderListRequest) -> Result<SearchPage, ApiError> {
        self.page(request.offset, request.limit)
    }
}
