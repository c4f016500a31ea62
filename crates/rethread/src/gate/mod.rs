use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::error::{ConvertError, Result};

/// Admission control for conversion runs: a fixed ceiling of in-flight
/// conversions and a wall-clock deadline around each admitted one.
///
/// Load beyond the ceiling is rejected outright rather than queued; the
/// deadline makes queued work likely to time out anyway. The semaphore's
/// check-then-acquire is atomic, and the permit travels into the worker
/// closure, so the slot is released exactly once per admitted run — when
/// the work actually finishes, even if the caller has already timed out
/// and abandoned it.
#[derive(Debug, Clone)]
pub struct ConversionGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
    deadline: Duration,
}

impl ConversionGate {
    #[must_use]
    pub fn new(limit: usize, deadline: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            deadline,
        }
    }

    /// Slots currently free, for diagnostics.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Admits `work` if a slot is free and runs it on the blocking pool
    /// under the deadline.
    ///
    /// Conversions are CPU-bound, so they run via `spawn_blocking`; the
    /// async caller only awaits completion, holding no shared lock while
    /// the work runs. On timeout the partial work product is discarded.
    pub async fn run<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() else {
            return Err(ConvertError::ServerBusy { limit: self.limit });
        };

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work()
        });

        match tokio::time::timeout(self.deadline, handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => Err(ConvertError::Internal(format!(
                "conversion task failed: {join_error}"
            ))),
            Err(_elapsed) => Err(ConvertError::Timeout {
                budget_ms: self.deadline.as_millis() as u64,
            }),
        }
    }
}
