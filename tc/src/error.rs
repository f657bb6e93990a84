//! Error taxonomy for the capture pipeline
//!
//! Only these errors cross the external boundary. LLM failures never appear
//! here: stages absorb them into degraded-but-valid results, so the caller
//! sees lower confidence and more clarification questions instead of a 5xx.

use std::time::Duration;
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced to the external caller
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Malformed or oversized input text; reject immediately, no retry
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Concurrent LLM call budget exceeded; retryable
    #[error("Service busy, retry after {retry_after:?}")]
    ServiceBusy { retry_after: Duration },

    /// Clarify or lookup against a task id nobody has seen
    #[error("Unknown task: {0}")]
    TaskNotFound(String),

    /// Persistence boundary failure
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    /// Knowledge-graph provider failure
    #[error("Context provider error: {0}")]
    Context(String),
}

impl CaptureError {
    /// True when the caller should back off and try again
    pub fn is_retryable(&self) -> bool {
        matches!(self, CaptureError::ServiceBusy { .. })
    }
}
