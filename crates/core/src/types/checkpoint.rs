//! Durable progress marker for resumable paginated listings.

use serde::{Deserialize, Serialize};

/// Progress of a long-running paginated fetch.
///
/// Written after every appended page and removed once the listing
/// completes. Its presence on disk means a previous run did not finish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationCheckpoint {
    /// Offset of the next page to request.
    pub offset: u64,
    /// Total reported by the upstream service.
    pub total: u64,
    /// Records appended to the output so far.
    pub fetched: u64,
    /// Number of the next page to request (1-based).
    pub page: u64,
    /// Output file being appended to.
    pub output_path: String,
}

impl PaginationCheckpoint {
    /// Checkpoint for a fresh run.
    #[must_use]
    pub fn fresh(output_path: impl Into<String>) -> Self {
        Self {
            offset: 0,
            total: 0,
            fetched: 0,
            page: 1,
            output_path: output_path.into(),
        }
    }

    /// Advance past a page of `count` records.
    pub const fn advance(&mut self, count: u64, total: u64) {
        self.offset += count;
        self.fetched += count;
        self.total = total;
        self.page += 1;
    }
}
