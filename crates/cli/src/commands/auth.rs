//! Credential check.
//!
//! # Usage
//!
//! ```bash
//! storeops --env staging auth
//! ```

use super::Session;

/// Exchange credentials and log when the token expires. The token itself is
/// never printed.
pub async fn check(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let token = session.client.authenticate().await?;

    match token.expires_at_utc() {
        Some(expiry) => tracing::info!(
            "Authenticated against {} - token valid until {}",
            session.env(),
            expiry.to_rfc3339()
        ),
        None => tracing::info!("Authenticated against {}", session.env()),
    }
    Ok(())
}
