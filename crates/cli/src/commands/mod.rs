//! Command implementations.
//!
//! Each command loads what it needs, runs one flow from `storeops_admin`,
//! and logs a summary. Errors bubble up to `main` for the exit code.

pub mod auth;
pub mod mine;
pub mod orders;
pub mod products;
pub mod search;

use std::path::PathBuf;

use storeops_admin::{AdminConfig, CommerceClient, OutputConfig, OutputStore};

/// Configuration, API client and output store for one environment.
pub struct Session {
    pub config: AdminConfig,
    pub client: CommerceClient,
    pub store: OutputStore,
}

impl Session {
    /// Load configuration for `env` and build the client.
    ///
    /// `output_dir` overrides the configured output directory.
    pub fn open(env: &str, output_dir: Option<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = AdminConfig::from_env(env)?;
        if let Some(dir) = output_dir {
            config.output = OutputConfig::in_dir(dir);
        }

        let client = CommerceClient::new(&config.environment, config.request_timeout)?;
        let store = OutputStore::new(&config.output.output_dir);

        tracing::debug!(
            environment = %config.environment.name,
            base_url = %config.environment.base_url,
            output_dir = %config.output.output_dir.display(),
            "Session ready"
        );

        Ok(Self {
            config,
            client,
            store,
        })
    }

    /// Environment name.
    pub fn env(&self) -> &str {
        &self.config.environment.name
    }
}
