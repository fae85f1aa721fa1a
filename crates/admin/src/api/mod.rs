//! Admin REST API access.
//!
//! # Architecture
//!
//! - [`auth`] exchanges client credentials for a bearer token
//! - [`client`] holds the HTTP client and the cached token
//! - The flows in this crate depend on the [`SearchApi`], [`ProductApi`] and
//!   [`OrderApi`] traits rather than on [`CommerceClient`], so they can run
//!   against in-memory fakes in tests.

pub mod auth;
pub mod client;

pub use auth::AccessToken;
pub use client::CommerceClient;

use std::future::Future;

use serde_json::Value;
use storeops_core::Record;
use thiserror::Error;

/// Errors that can occur when interacting with the admin API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Credential exchange failed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}

impl ApiError {
    /// HTTP status code behind this error, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Status { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::RateLimited(_) => Some(429),
            Self::Parse(_) | Self::AuthenticationFailed(_) => None,
        }
    }

    /// Whether the remote service reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// =============================================================================
// Requests and responses
// =============================================================================

/// Searchable collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchResource {
    Profiles,
    Products,
}

impl SearchResource {
    /// Path segment under the API base URL.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::Products => "products",
        }
    }
}

impl std::fmt::Display for SearchResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// One page of a profile/product search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub resource: SearchResource,
    /// Query in the API's query language (`email co "x"`).
    pub query: Option<String>,
    /// Output fields, without the `items.` prefix.
    pub fields: Vec<String>,
    pub offset: u64,
    pub limit: u32,
}

/// Sort direction for order listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One page of an order listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderListRequest {
    pub query: Option<String>,
    /// Value of the `queryFormat` parameter.
    pub query_format: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub limit: u32,
    pub offset: u64,
}

/// A page returned by a search or listing endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    /// Total reported by the service.
    pub total: u64,
    /// Object items of the page, in response order.
    pub items: Vec<Record>,
    /// Full response body as received.
    pub raw: Value,
}

impl SearchPage {
    /// Interpret a response body shaped `{ total, items: [...] }`.
    ///
    /// Non-object items are dropped from `items` but kept in `raw`. A
    /// missing `total` is taken as the number of items.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Parse` if the body has no `items` array.
    pub fn from_body(raw: Value) -> Result<Self, ApiError> {
        let items: Vec<Record> = raw
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| ApiError::Parse("response has no items array".to_string()))?
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect();
        let total = raw
            .get("total")
            .and_then(Value::as_u64)
            .unwrap_or(items.len() as u64);
        Ok(Self { total, items, raw })
    }

    /// Number of items on the page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// Paginated profile/product search.
pub trait SearchApi: Send + Sync {
    fn search(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<SearchPage, ApiError>> + Send;
}

/// Product mutations.
pub trait ProductApi: Send + Sync {
    fn delete_product(&self, id: &str) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Order reads.
pub trait OrderApi: Send + Sync {
    /// Fetch a single order, optionally restricted to `fields`.
    fn get_order(
        &self,
        id: &str,
        fields: &[String],
    ) -> impl Future<Output = Result<Record, ApiError>> + Send;

    /// Fetch one page of the order listing.
    fn list_orders(
        &self,
        request: &OrderListRequest,
    ) -> impl Future<Output = Result<SearchPage, ApiError>> + Send;
}
