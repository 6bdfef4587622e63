//! Backoff-governed retry of single store calls.

use std::future::Future;

use dynakit_core::backoff::{BackoffConfig, BackoffPolicy};
use dynakit_core::store::{StoreOperation, StoreResult};
use tokio::time::Instant;

use crate::deadline::Deadline;
use crate::error::{Error, Result};

/// Runs idempotent store calls under a [`BackoffPolicy`].
///
/// Terminal errors are returned on the first failure. Transient errors are
/// retried until the elapsed-time budget runs out or the caller's deadline
/// fires. The executor does not deduplicate: a call that failed after the
/// store applied it will be applied again.
#[derive(Debug, Clone, Copy)]
pub struct RetryExecutor {
    policy: BackoffPolicy,
}

impl RetryExecutor {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            policy: BackoffPolicy::new(config),
        }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Invokes `call` until it succeeds, fails terminally, or the budget or
    /// deadline is used up.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: StoreOperation,
        deadline: &Deadline,
        mut call: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            let outcome = deadline
                .run(call())
                .await
                .map_err(|_| Error::DeadlineExceeded { operation })?;

            let err = match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(
                            operation = %operation,
                            attempts = attempt + 1,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Store call recovered after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(err) if err.is_terminal() => {
                    tracing::debug!(operation = %operation, error = %err, "Terminal store error");
                    return Err(Error::Store(err));
                }
                Err(err) => err,
            };

            let elapsed = started.elapsed();
            if self.policy.exhausted(elapsed) {
                tracing::error!(
                    operation = %operation,
                    attempts = attempt + 1,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %err,
                    "Retry budget exhausted"
                );
                return Err(Error::RetryBudgetExhausted {
                    operation,
                    attempts: attempt + 1,
                    elapsed,
                    last: err,
                });
            }

            let delay = self.policy.next_delay(attempt);
            let delay_ms = delay.as_millis() as u64;
            let elapsed_ms = elapsed.as_millis() as u64;
            let used = self.policy.budget_used(elapsed);
            if used < 0.5 {
                tracing::debug!(operation = %operation, attempt, delay_ms, elapsed_ms, error = %err, "Retrying store call");
            } else if used < 0.8 {
                tracing::info!(operation = %operation, attempt, delay_ms, elapsed_ms, error = %err, "Retrying store call");
            } else {
                tracing::warn!(operation = %operation, attempt, delay_ms, elapsed_ms, error = %err, "Retrying store call, budget nearly spent");
            }

            deadline
                .sleep(delay)
                .await
                .map_err(|_| Error::DeadlineExceeded { operation })?;
            attempt = attempt.saturating_add(1);
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
