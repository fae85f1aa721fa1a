//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! Credentials are per target environment. `<ENV>` is the environment name
//! given on the command line, upper-cased, with `-` replaced by `_`
//! (`--env staging-eu` reads `STOREOPS_STAGING_EU_*`).
//!
//! ## Required (remote commands)
//! - `STOREOPS_<ENV>_BASE_URL` - Base URL of the admin REST API
//! - `STOREOPS_<ENV>_CLIENT_ID` - Client-credential grant client ID
//! - `STOREOPS_<ENV>_CLIENT_SECRET` - Client-credential grant secret (HIGH PRIVILEGE)
//!
//! ## Optional
//! - `STOREOPS_PAGE_SIZE` - Search page size (default: 250, max 1000)
//! - `STOREOPS_OUTPUT_DIR` - Directory for responses and reports (default: output)
//! - `STOREOPS_ARCHIVE_DIR` - Where processed input lists go (default: `<output>/archive`)
//! - `STOREOPS_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 60)

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

pub const DEFAULT_PAGE_SIZE: u32 = 250;
const MAX_PAGE_SIZE: u32 = 1000;
const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
    #[error("Invalid environment name: {0:?}")]
    InvalidEnvironment(String),
}

/// Connection settings for one target environment.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct EnvironmentConfig {
    /// Environment name as given on the command line.
    pub name: String,
    /// API base URL, without trailing slash.
    pub base_url: Url,
    /// Client-credential grant client ID
    pub client_id: String,
    /// Client-credential grant secret (HIGH PRIVILEGE)
    pub client_secret: SecretString,
}

impl std::fmt::Debug for EnvironmentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Where run artifacts are written.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Responses, consolidated files, mining results and reports.
    pub output_dir: PathBuf,
    /// Processed input lists are moved here.
    pub archive_dir: PathBuf,
}

/// Full configuration for commands that talk to the API.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub environment: EnvironmentConfig,
    pub output: OutputConfig,
    /// Search page size
    pub page_size: u32,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl AdminConfig {
    /// Load configuration for `env_name` from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the client secret looks like a placeholder.
    pub fn from_env(env_name: &str) -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(env_name, |key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`AdminConfig::from_env`].
    pub fn from_lookup(
        env_name: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let environment = EnvironmentConfig::from_lookup(env_name, &lookup)?;
        let output = OutputConfig::from_lookup(&lookup);

        let page_size = get_or_default(&lookup, "STOREOPS_PAGE_SIZE", &DEFAULT_PAGE_SIZE.to_string())
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOREOPS_PAGE_SIZE".to_string(), e.to_string()))?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidEnvVar(
                "STOREOPS_PAGE_SIZE".to_string(),
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        let timeout_secs = get_or_default(
            &lookup,
            "STOREOPS_REQUEST_TIMEOUT_SECS",
            &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("STOREOPS_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        Ok(Self {
            environment,
            output,
            page_size,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl EnvironmentConfig {
    fn from_lookup(
        env_name: &str,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let prefix = env_var_prefix(env_name)?;

        let url_key = format!("{prefix}_BASE_URL");
        let raw_url = get_required(lookup, &url_key)?;
        let base_url = Url::parse(raw_url.trim_end_matches('/'))
            .map_err(|e| ConfigError::InvalidEnvVar(url_key.clone(), e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                url_key,
                "must be an http or https URL".to_string(),
            ));
        }

        let secret_key = format!("{prefix}_CLIENT_SECRET");
        let client_secret = get_required(lookup, &secret_key)?;
        validate_secret(&client_secret, &secret_key)?;

        Ok(Self {
            name: env_name.to_string(),
            base_url,
            client_id: get_required(lookup, &format!("{prefix}_CLIENT_ID"))?,
            client_secret: SecretString::from(client_secret),
        })
    }
}

impl OutputConfig {
    /// Load output locations from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let output_dir = PathBuf::from(get_or_default(lookup, "STOREOPS_OUTPUT_DIR", DEFAULT_OUTPUT_DIR));
        let archive_dir = lookup("STOREOPS_ARCHIVE_DIR")
            .map_or_else(|| output_dir.join("archive"), PathBuf::from);
        Self {
            output_dir,
            archive_dir,
        }
    }

    /// Use `dir` for output, with the archive inside it.
    #[must_use]
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let output_dir = dir.into();
        Self {
            archive_dir: output_dir.join("archive"),
            output_dir,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable prefix for an environment name (`staging-eu` -> `STOREOPS_STAGING_EU`).
fn env_var_prefix(env_name: &str) -> Result<String, ConfigError> {
    if env_name.is_empty()
        || !env_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::InvalidEnvironment(env_name.to_string()));
    }
    Ok(format!(
        "STOREOPS_{}",
        env_name.to_ascii_uppercase().replace('-', "_")
    ))
}

/// Get a required variable.
fn get_required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a variable with a default value.
fn get_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Validate that a secret is not a placeholder.
fn validate_secret(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}
