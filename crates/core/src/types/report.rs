//! Outcome reports for bulk runs (deletion and fetch).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Which bulk operation a report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOperation {
    /// Remote deletion of products.
    Delete,
    /// Remote fetch of orders.
    Fetch,
}

impl std::fmt::Display for BulkOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delete => write!(f, "delete"),
            Self::Fetch => write!(f, "fetch"),
        }
    }
}

/// One failed ID within a bulk run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordError {
    /// The ID that failed.
    pub id: String,
    /// Error message.
    pub error: String,
    /// HTTP status code, when the failure came from a response.
    pub status_code: Option<u16>,
}

impl RecordError {
    /// Whether the remote service reported the record as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }
}

/// Counters accumulated over a bulk run.
///
/// Counters only ever increase while the run is in progress. The report is
/// written once, after [`BulkReport::finish`].
#[derive(Debug, Clone, PartialEq)]
pub struct BulkReport {
    pub operation: BulkOperation,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<RecordError>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub environment: String,
    pub concurrency: usize,
}

impl BulkReport {
    /// Start a report for `total` input IDs.
    #[must_use]
    pub fn start(
        operation: BulkOperation,
        environment: impl Into<String>,
        total: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            operation,
            total,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            errors: Vec::new(),
            start_time: Utc::now(),
            end_time: None,
            environment: environment.into(),
            concurrency,
        }
    }

    pub const fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub const fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_failure(&mut self, id: impl Into<String>, error: impl Into<String>, status_code: Option<u16>) {
        self.failed += 1;
        self.errors.push(RecordError {
            id: id.into(),
            error: error.into(),
            status_code,
        });
    }

    /// Stamp the end time.
    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    /// Failures that were "not found" responses.
    #[must_use]
    pub fn not_found_count(&self) -> usize {
        self.errors.iter().filter(|e| e.is_not_found()).count()
    }

    /// Whether every submitted ID succeeded.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Serialized shape. The success counter is named after the operation.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportView<'a> {
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fetched: Option<usize>,
    failed: usize,
    skipped: usize,
    errors: &'a [RecordError],
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    environment: &'a str,
    concurrency: usize,
}

impl Serialize for BulkReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (deleted, fetched) = match self.operation {
            BulkOperation::Delete => (Some(self.succeeded), None),
            BulkOperation::Fetch => (None, Some(self.succeeded)),
        };
        ReportView {
            total: self.total,
            deleted,
            fetched,
            failed: self.failed,
            skipped: self.skipped,
            errors: &self.errors,
            start_time: self.start_time,
            end_time: self.end_time,
            environment: &self.environment,
            concurrency: self.concurrency,
        }
        .serialize(serializer)
    }
}
