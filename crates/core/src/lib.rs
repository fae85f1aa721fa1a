//! Storeops Core - Shared types and the typed filter engine.
//!
//! This crate provides the pure building blocks used by the other storeops
//! crates:
//! - `admin` - API client, output store and the fetch/delete/mining flows
//! - `cli` - Command-line surface
//!
//! # Architecture
//!
//! The core crate contains only types and algorithms - no I/O, no HTTP
//! clients, no filesystem access. This keeps the filter engine testable with
//! plain values.
//!
//! # Modules
//!
//! - [`types`] - Records, record sets, bulk reports and pagination checkpoints
//! - [`mining`] - Field type inference, condition evaluation and filtering
//! - [`tabular`] - CSV rendering of record collections
//! - [`query`] - Search query rendering for the admin API
//! - [`naming`] - Collision-free output file names

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod mining;
pub mod naming;
pub mod query;
pub mod tabular;
pub mod types;

pub use types::*;
