//! Attempt loop with per-attempt deadline, linear backoff and cancellation.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::outcome::FallbackReason;
use crate::error::{ClientResult, PredictionError};

/// Linear backoff: after failed attempt `n` the next attempt waits `n * step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff_step: Duration,
    /// Deadline for each attempt.
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (1-based), or `None`
    /// when `attempt` was the last one.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_attempts).then(|| self.backoff_step * attempt)
    }

    /// Drive `call` until it succeeds, attempts run out or `cancel` fires.
    ///
    /// An attempt that outlives `timeout` is dropped, which aborts any
    /// in-flight request, and counts as a failure. Cancellation interrupts
    /// both in-flight attempts and backoff sleeps and is terminal.
    pub async fn run<T, F, Fut>(
        &self,
        endpoint: &str,
        cancel: &CancellationToken,
        mut call: F,
    ) -> Result<T, FallbackReason>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        if self.max_attempts == 0 {
            return Err(FallbackReason::Disabled);
        }

        let mut last_error: Option<PredictionError> = None;

        for attempt in 1..=self.max_attempts {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(PredictionError::Cancelled),
                res = tokio::time::timeout(self.timeout, call()) => match res {
                    Ok(inner) => inner,
                    Err(_) => Err(PredictionError::Timeout(self.timeout)),
                },
            };

            match outcome {
                Ok(value) => {
                    debug!(endpoint, attempt, "ML service call succeeded");
                    return Ok(value);
                }
                Err(PredictionError::Cancelled) => {
                    debug!(endpoint, attempt, "ML service call cancelled");
                    return Err(FallbackReason::Cancelled);
                }
                Err(err) => {
                    warn!(
                        endpoint,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "ML service call failed"
                    );
                    last_error = Some(err);
                }
            }

            if let Some(delay) = self.delay_after(attempt) {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(FallbackReason::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        Err(FallbackReason::Exhausted {
            attempts: self.max_attempts,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}
