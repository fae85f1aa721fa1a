//! Core types for storeops.
//!
//! Records are schema-free JSON objects; everything else here is metadata
//! describing a run over those records.

pub mod checkpoint;
pub mod record;
pub mod report;

pub use checkpoint::PaginationCheckpoint;
pub use record::{Record, RecordSet, field_present, lookup_path, value_text};
pub use report::{BulkOperation, BulkReport, RecordError};
