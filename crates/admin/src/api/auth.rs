//! Client-credential token exchange.
//!
//! Exchanges a client ID and secret for a bearer token at `<base>/login`.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::ApiError;

/// Seconds before expiry at which a token is treated as expired.
pub const EXPIRY_BUFFER_SECS: i64 = 60;

/// Bearer token obtained from the login endpoint.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Bearer token for API requests.
    pub access_token: SecretString,
    /// Unix timestamp when the token expires.
    pub expires_at: i64,
}

/// Response from the login endpoint.
#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
    /// Token lifetime in seconds.
    expires_in: i64,
}

/// Error response from the login endpoint.
#[derive(Deserialize)]
struct LoginErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl AccessToken {
    /// Token expiring `expires_in` seconds from now.
    #[must_use]
    pub fn new(access_token: impl Into<String>, expires_in: i64) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            expires_at: Utc::now().timestamp() + expires_in,
        }
    }

    /// Check if the token is expired.
    ///
    /// Returns true if the token expires within the next 60 seconds.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_within(EXPIRY_BUFFER_SECS)
    }

    /// Check if the token will expire within the given number of seconds.
    #[must_use]
    pub fn expires_within(&self, seconds: i64) -> bool {
        let now = Utc::now().timestamp();
        now >= self.expires_at - seconds
    }

    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at, 0)
    }
}

/// Exchange client credentials for a bearer token.
///
/// # Errors
///
/// Returns `ApiError::AuthenticationFailed` if the credentials are rejected
/// or the service answers with a non-success status.
#[instrument(skip(client, client_secret), fields(client_id = %client_id))]
pub async fn authenticate(
    client: &reqwest::Client,
    login_url: &str,
    client_id: &str,
    client_secret: &SecretString,
) -> Result<AccessToken, ApiError> {
    let now = Utc::now().timestamp();

    let response = client
        .post(login_url)
        .basic_auth(client_id, Some(client_secret.expose_secret()))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;

    let status = response.status();

    if status.is_success() {
        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::AuthenticationFailed(format!("unreadable token response: {e}")))?;

        Ok(AccessToken {
            access_token: SecretString::from(login.access_token),
            expires_at: now + login.expires_in,
        })
    } else if status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
        || status == reqwest::StatusCode::BAD_REQUEST
    {
        let error_response: LoginErrorResponse =
            response.json().await.unwrap_or(LoginErrorResponse {
                error: None,
                error_description: None,
                message: None,
            });

        let message = error_response
            .error_description
            .or(error_response.message)
            .or(error_response.error)
            .unwrap_or_else(|| "Invalid credentials".to_string());

        Err(ApiError::AuthenticationFailed(message))
    } else {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(ApiError::AuthenticationFailed(format!(
            "HTTP {status}: {error_text}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_expired() {
        let now = Utc::now().timestamp();

        // Token that expired an hour ago
        let expired_token = AccessToken {
            access_token: SecretString::from("test"),
            expires_at: now - 3600,
        };
        assert!(expired_token.is_expired());

        // Token that expires in an hour
        let valid_token = AccessToken::new("test", 3600);
        assert!(!valid_token.is_expired());

        // Token that expires in 30 seconds (should be considered expired due to 60s buffer)
        let almost_expired = AccessToken::new("test", 30);
        assert!(almost_expired.is_expired());
    }

    #[test]
    fn test_expires_within() {
        let token = AccessToken::new("test", 300);
        assert!(!token.expires_within(60));
        assert!(token.expires_within(600));
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let token = AccessToken::new("super-secret-bearer", 3600);
        let debug_output = format!("{token:?}");
        assert!(!debug_output.contains("super-secret-bearer"));
    }
}
