//! Outbound LLM concurrency cap
//!
//! The LLM is the scarce resource: every capture or clarify request holds one
//! permit for the duration of its (strictly sequential) completion calls.
//! When the cap is reached, admission waits briefly and then fails with
//! `ServiceBusy` instead of building an unbounded retry storm upstream.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use crate::error::CaptureError;

/// Suggested client backoff when admission fails
const BUSY_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Bounded admission gate for LLM-backed requests
#[derive(Clone)]
pub struct LlmGate {
    semaphore: Arc<Semaphore>,
    admission_timeout: Duration,
}

impl LlmGate {
    /// Create a gate admitting at most `max_concurrent` requests
    pub fn new(max_concurrent: usize, admission_timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            admission_timeout,
        }
    }

    /// Acquire a permit, queueing up to the admission timeout
    pub async fn admit(&self) -> Result<OwnedSemaphorePermit, CaptureError> {
        match tokio::time::timeout(self.admission_timeout, self.semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) | Err(_) => {
                warn!(
                    timeout_ms = self.admission_timeout.as_millis() as u64,
                    "admit: LLM call budget exhausted"
                );
                Err(CaptureError::ServiceBusy {
                    retry_after: BUSY_RETRY_AFTER,
                })
            }
        }
    }

    /// Permits currently available (test/diagnostic aid)
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_admit_and_release() {
        let gate = LlmGate::new(2, Duration::from_millis(10));
        let p1 = gate.admit().await.unwrap();
        let _p2 = gate.admit().await.unwrap();
        assert_eq!(gate.available(), 0);

        drop(p1);
        assert_eq!(gate.available(), 1);
        let _p3 = gate.admit().await.unwrap();
    }

    #[tokio::test]
    async fn test_admit_busy_after_timeout() {
        let gate = LlmGate::new(1, Duration::from_millis(10));
        let _held = gate.admit().await.unwrap();

        let err = gate.admit().await.unwrap_err();
        assert!(matches!(err, CaptureError::ServiceBusy { .. }));
    }
}
