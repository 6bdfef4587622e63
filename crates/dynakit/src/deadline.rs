//! Caller-supplied, cancellable deadlines.
//!
//! A [`Deadline`] bounds every suspension point of an operation: the store
//! call itself, retry sleeps and status-polling sleeps.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// The deadline passed or its token was cancelled.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("deadline expired")]
pub struct Expired;

/// An optional point in time plus an optional cancellation token.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    expires_at: Option<Instant>,
    token: Option<CancellationToken>,
}

impl Deadline {
    /// A deadline that never fires.
    pub fn none() -> Self {
        Self::default()
    }

    /// Fires `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self::at(Instant::now() + timeout)
    }

    /// Fires at `instant`.
    pub fn at(instant: Instant) -> Self {
        Self {
            expires_at: Some(instant),
            token: None,
        }
    }

    /// Also fires when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.token.as_ref().is_some_and(|t| t.is_cancelled())
            || self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left before the deadline, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Runs `future` unless the deadline fires first.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, Expired> {
        tokio::select! {
            biased;
            _ = self.expired() => Err(Expired),
            output = future => Ok(output),
        }
    }

    /// Sleeps for `duration` unless the deadline fires first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Expired> {
        self.run(tokio::time::sleep(duration)).await
    }

    async fn expired(&self) {
        match (self.expires_at, &self.token) {
            (None, None) => std::future::pending::<()>().await,
            (Some(at), None) => tokio::time::sleep_until(at).await,
            (None, Some(token)) => token.cancelled().await,
            (Some(at), Some(token)) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(at) => {}
                    _ = token.cancelled() => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_none_never_expires() {
        let deadline = Deadline::none();
        assert!(!deadline.is_expired());
        assert_eq!(deadline.remaining(), None);
        assert_eq!(deadline.sleep(Duration::from_secs(3600)).await, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_interrupted_by_deadline() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let start = Instant::now();

        assert_eq!(deadline.sleep(Duration::from_secs(60)).await, Err(Expired));
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert!(deadline.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_completes_before_deadline() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let value = deadline.run(async { 7 }).await;
        assert_eq!(value, Ok(7));
        assert_eq!(deadline.remaining(), Some(Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_fires() {
        let token = CancellationToken::new();
        let deadline = Deadline::none().with_cancellation(token.clone());

        let waiter = {
            let deadline = deadline.clone();
            tokio::spawn(async move { deadline.sleep(Duration::from_secs(60)).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();

        assert_eq!(waiter.await.unwrap(), Err(Expired));
        assert!(deadline.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_deadline_skips_future() {
        let deadline = Deadline::after(Duration::ZERO);
        let result = deadline.run(async { unreachable!() }).await;
        assert_eq!(result, Err::<(), _>(Expired));
    }
}
