//! Admin REST API client.
//!
//! Provides bearer-authenticated access to the profile, product and order
//! endpoints of one environment.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use storeops_core::Record;
use storeops_core::query::item_fields;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::auth::{AccessToken, authenticate};
use super::{ApiError, OrderApi, OrderListRequest, ProductApi, SearchApi, SearchPage, SearchRequest};
use crate::config::EnvironmentConfig;

/// Admin REST API client.
///
/// # Authentication
///
/// Uses client-credential bearer tokens. The token is cached in memory and
/// exchanged again lazily before a request when it is within 60 seconds of
/// expiry.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    /// Base URL without trailing slash.
    base_url: String,
    environment: String,
    client_id: String,
    client_secret: SecretString,
    /// In-memory token cache
    token: RwLock<Option<AccessToken>>,
}

impl CommerceClient {
    /// Create a client for one environment.
    ///
    /// `timeout` applies to every request.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be created.
    pub fn new(config: &EnvironmentConfig, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                environment: config.name.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                token: RwLock::new(None),
            }),
        })
    }

    /// Environment this client talks to.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.inner.environment
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.inner.base_url)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Exchange the configured credentials for a fresh token and cache it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::AuthenticationFailed` if the credentials are rejected.
    #[instrument(skip(self), fields(environment = %self.inner.environment))]
    pub async fn authenticate(&self) -> Result<AccessToken, ApiError> {
        let token = authenticate(
            &self.inner.client,
            &self.endpoint("login"),
            &self.inner.client_id,
            &self.inner.client_secret,
        )
        .await?;

        *self.inner.token.write().await = Some(token.clone());

        Ok(token)
    }

    /// Get the current token (if set).
    pub async fn get_token(&self) -> Option<AccessToken> {
        self.inner.token.read().await.clone()
    }

    /// Bearer for the next request, exchanging credentials when needed.
    async fn bearer(&self) -> Result<SecretString, ApiError> {
        if let Some(token) = self.inner.token.read().await.as_ref()
            && !token.is_expired()
        {
            return Ok(token.access_token.clone());
        }

        debug!("Access token missing or near expiry, authenticating");
        Ok(self.authenticate().await?.access_token)
    }

    // =========================================================================
    // Requests
    // =========================================================================

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        let bearer = self.bearer().await?;
        let response = self
            .inner
            .client
            .get(self.endpoint(path))
            .bearer_auth(bearer.expose_secret())
            .query(query)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle API response, parsing JSON or returning error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ApiError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(self.parse_error(response).await)
    }

    /// Parse error response from the API.
    async fn parse_error(&self, response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();

        // Check for rate limiting
        if status == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return ApiError::RateLimited(retry_after);
        }

        if status == 404 {
            return ApiError::NotFound(response.url().path().to_string());
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        ApiError::Status { status, message }
    }
}

impl SearchApi for CommerceClient {
    #[instrument(skip(self), fields(resource = %request.resource, offset = request.offset))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, ApiError> {
        let mut query = vec![
            ("offset", request.offset.to_string()),
            ("limit", request.limit.to_string()),
        ];
        if let Some(q) = &request.query {
            query.push(("q", q.clone()));
        }
        let fields = item_fields(&request.fields);
        if !fields.is_empty() {
            query.push(("fields", fields));
        }

        let body = self.get_json(request.resource.path(), &query).await?;
        SearchPage::from_body(body)
    }
}

impl ProductApi for CommerceClient {
    #[instrument(skip(self))]
    async fn delete_product(&self, id: &str) -> Result<(), ApiError> {
        let bearer = self.bearer().await?;
        let response = self
            .inner
            .client
            .delete(self.endpoint(&format!("products/{}", urlencoding::encode(id))))
            .bearer_auth(bearer.expose_secret())
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(self.parse_error(response).await)
    }
}

impl OrderApi for CommerceClient {
    #[instrument(skip(self, fields))]
    async fn get_order(&self, id: &str, fields: &[String]) -> Result<Record, ApiError> {
        let mut query = Vec::new();
        let joined = fields.join(",");
        if !joined.is_empty() {
            query.push(("fields", joined));
        }

        let body = self
            .get_json(&format!("orders/{}", urlencoding::encode(id)), &query)
            .await?;
        match body {
            Value::Object(record) => Ok(record),
            other => Err(ApiError::Parse(format!(
                "expected an order object, got {}",
                storeops_core::value_text(&other)
            ))),
        }
    }

    #[instrument(skip(self), fields(offset = request.offset, limit = request.limit))]
    async fn list_orders(&self, request: &OrderListRequest) -> Result<SearchPage, ApiError> {
        let mut query = vec![
            ("limit", request.limit.to_string()),
            ("offset", request.offset.to_string()),
        ];
        if let Some(q) = &request.query {
            query.push(("q", q.clone()));
        }
        if let Some(format) = &request.query_format {
            query.push(("queryFormat", format.clone()));
        }
        if let Some(sort_by) = &request.sort_by {
            query.push(("sortBy", sort_by.clone()));
        }
        if let Some(order) = request.sort_order {
            query.push(("sortOrder", order.as_str().to_string()));
        }

        let body = self.get_json("orders", &query).await?;
        SearchPage::from_body(body)
    }
}
