//! Retry Logic
//!
//! Bounded retry loop with exponential backoff and cooperative cancellation.
//!
//! ```text
//! Attempting ─┬─> Success
//!             ├─> FatalFailure
//!             ├─> RetryableFailure ─┬─> (sleep) Attempting
//!             │                     └─> Exhausted
//!             └─> Cancelled
//! ```

use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{VaultDbError, VaultDbResult};
use crate::resilience::backoff::BackoffPolicy;

/// Runs an operation until it succeeds, fails fatally, runs out of attempts or
/// is cancelled. Holds no state between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor {
    policy: BackoffPolicy,
}

impl RetryExecutor {
    /// Create new retry executor.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy }
    }

    /// Execute `operation` with retry.
    ///
    /// `operation` labels logs and errors; `attempt_fn` receives the 1-based
    /// attempt number. Errors for which
    /// [`VaultDbError::is_retryable`] is false are returned as-is; the last
    /// retryable error is wrapped in [`VaultDbError::RetryExhausted`]. The
    /// token is checked before each attempt and raced against both the
    /// attempt itself and the backoff sleep.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        mut attempt_fn: F,
    ) -> VaultDbResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = VaultDbResult<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(VaultDbError::Cancelled { operation });
            }

            debug!(operation, attempt, max_attempts, "attempting");

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(VaultDbError::Cancelled { operation }),
                result = attempt_fn(attempt) => result,
            };

            let error = match result {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_retryable() => return Err(error),
                Err(error) => error,
            };

            if !self.policy.has_attempts_left(attempt) {
                warn!(
                    operation,
                    attempts = attempt,
                    error = %error,
                    "retries exhausted"
                );
                return Err(VaultDbError::RetryExhausted {
                    operation,
                    attempts: attempt,
                    source: Box::new(error),
                });
            }

            let delay = self.policy.delay(attempt);
            warn!(
                operation,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying after transient failure"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(VaultDbError::Cancelled { operation }),
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}
