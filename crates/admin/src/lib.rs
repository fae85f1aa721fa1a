//! Storeops Admin - API client and the fetch/delete/mining flows.
//!
//! This crate holds everything in storeops that touches the network or the
//! filesystem. The algorithms it drives live in `storeops-core`.
//!
//! # Security
//!
//! This crate uses HIGH PRIVILEGE credentials:
//! - Client-credential secrets for the admin REST API
//! - Bearer tokens that allow product deletion
//!
//! Secrets are held in `secrecy::SecretString` and never logged.
//!
//! # Modules
//!
//! - [`config`] - Environment-driven configuration
//! - [`api`] - REST client, token cache and the capability traits
//! - [`store`] - Output directory access
//! - [`search`] - Paginated profile/product search
//! - [`consolidate`] - Merge page files into one record set
//! - [`bulk`] - Batched execution over ID lists
//! - [`products`] - Bulk product deletion
//! - [`orders`] - Order counts, bulk fetch and resumable listing
//! - [`mining`] - Typed filtering of saved record sets

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod bulk;
pub mod config;
pub mod consolidate;
pub mod mining;
pub mod orders;
pub mod products;
pub mod search;
pub mod store;

pub use api::{ApiError, CommerceClient};
pub use config::{AdminConfig, ConfigError, OutputConfig};
pub use store::{OutputStore, StoreError};
