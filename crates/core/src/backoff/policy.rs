//! Pure delay computation for retries.

use std::time::Duration;

use rand::Rng;

use super::BackoffConfig;

/// Stateless exponential backoff over a validated [`BackoffConfig`].
///
/// `next_delay(n) = min(start * multiplier^n, max)`, optionally scaled down
/// by jitter. Reusable across any number of operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    config: BackoffConfig,
}

impl BackoffPolicy {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Delay before retry number `attempt` (zero-based), before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let max = self.config.max_interval();
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let secs = self.config.start_interval().as_secs_f64() * self.config.multiplier().powi(exponent);
        if secs.is_finite() && secs < max.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            max
        }
    }

    /// Delay before retry number `attempt`, jittered with the thread RNG.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        self.next_delay_with(attempt, &mut rand::rng())
    }

    /// Delay before retry number `attempt`, jittered with the given RNG.
    ///
    /// The jittered delay lies in `[base * (1 - jitter), base]`, so it never
    /// exceeds the configured ceiling.
    pub fn next_delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = self.base_delay(attempt);
        let jitter = self.config.jitter();
        if jitter <= 0.0 {
            return base;
        }
        let factor = rng.random_range((1.0 - jitter)..=1.0);
        base.mul_f64(factor)
    }

    /// True once `elapsed` has passed the total retry budget.
    pub fn exhausted(&self, elapsed: Duration) -> bool {
        elapsed > self.config.max_elapsed_time()
    }

    /// Fraction of the retry budget consumed, clamped to `[0, 1]`.
    pub fn budget_used(&self, elapsed: Duration) -> f64 {
        let budget = self.config.max_elapsed_time().as_secs_f64();
        (elapsed.as_secs_f64() / budget).clamp(0.0, 1.0)
    }
}

impl From<BackoffConfig> for BackoffPolicy {
    fn from(config: BackoffConfig) -> Self {
        Self::new(config)
    }
}
