//! Backoff configuration with validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{env_f64, env_millis, ConfigError, Result};

/// Default first retry delay.
pub const DEFAULT_START_INTERVAL: Duration = Duration::from_millis(50);
/// Default ceiling on a single retry delay.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(5);
/// Default total retry budget per logical operation.
pub const DEFAULT_MAX_ELAPSED_TIME: Duration = Duration::from_secs(30);
/// Default growth factor between consecutive delays.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Retry delay configuration (validated).
///
/// Invariants: both intervals are positive, `start_interval <= max_interval`,
/// the multiplier is at least 1 and jitter lies within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BackoffSettings", into = "BackoffSettings")]
pub struct BackoffConfig {
    start_interval: Duration,
    max_interval: Duration,
    max_elapsed_time: Duration,
    multiplier: f64,
    jitter: f64,
}

impl BackoffConfig {
    /// Create and validate a backoff config without jitter.
    pub fn new(
        start_interval: Duration,
        max_interval: Duration,
        max_elapsed_time: Duration,
    ) -> Result<Self> {
        Self {
            start_interval,
            max_interval,
            max_elapsed_time,
            multiplier: DEFAULT_MULTIPLIER,
            jitter: 0.0,
        }
        .validated()
    }

    /// Sets the growth factor between consecutive delays.
    pub fn with_multiplier(mut self, multiplier: f64) -> Result<Self> {
        self.multiplier = multiplier;
        self.validated()
    }

    /// Sets the jitter fraction; each delay is scaled by a random factor in
    /// `[1 - jitter, 1]`.
    pub fn with_jitter(mut self, jitter: f64) -> Result<Self> {
        self.jitter = jitter;
        self.validated()
    }

    /// Builds a config from `DYNAKIT_BACKOFF_*` environment variables,
    /// falling back to the defaults for unset ones.
    pub fn from_env() -> Result<Self> {
        let config = Self::new(
            env_millis("DYNAKIT_BACKOFF_START_MS")?.unwrap_or(DEFAULT_START_INTERVAL),
            env_millis("DYNAKIT_BACKOFF_MAX_MS")?.unwrap_or(DEFAULT_MAX_INTERVAL),
            env_millis("DYNAKIT_BACKOFF_MAX_ELAPSED_MS")?.unwrap_or(DEFAULT_MAX_ELAPSED_TIME),
        )?;
        match env_f64("DYNAKIT_BACKOFF_JITTER")? {
            Some(jitter) => config.with_jitter(jitter),
            None => Ok(config),
        }
    }

    pub fn start_interval(&self) -> Duration {
        self.start_interval
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    pub fn max_elapsed_time(&self) -> Duration {
        self.max_elapsed_time
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    fn validated(self) -> Result<Self> {
        if self.start_interval.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "start_interval",
            });
        }
        if self.max_interval.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "max_interval",
            });
        }
        if self.max_elapsed_time.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "max_elapsed_time",
            });
        }
        if self.start_interval > self.max_interval {
            return Err(ConfigError::StartExceedsMax {
                start: self.start_interval,
                max: self.max_interval,
            });
        }
        if !(self.multiplier >= 1.0 && self.multiplier.is_finite()) {
            return Err(ConfigError::InvalidMultiplier(self.multiplier));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::InvalidJitter(self.jitter));
        }
        Ok(self)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            start_interval: DEFAULT_START_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            max_elapsed_time: DEFAULT_MAX_ELAPSED_TIME,
            multiplier: DEFAULT_MULTIPLIER,
            jitter: 0.0,
        }
    }
}

/// Serialized form of [`BackoffConfig`], in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackoffSettings {
    pub start_interval_ms: u64,
    pub max_interval_ms: u64,
    pub max_elapsed_time_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default)]
    pub jitter: f64,
}

fn default_multiplier() -> f64 {
    DEFAULT_MULTIPLIER
}

impl TryFrom<BackoffSettings> for BackoffConfig {
    type Error = ConfigError;

    fn try_from(settings: BackoffSettings) -> Result<Self> {
        Self::new(
            Duration::from_millis(settings.start_interval_ms),
            Duration::from_millis(settings.max_interval_ms),
            Duration::from_millis(settings.max_elapsed_time_ms),
        )?
        .with_multiplier(settings.multiplier)?
        .with_jitter(settings.jitter)
    }
}

impl From<BackoffConfig> for BackoffSettings {
    fn from(config: BackoffConfig) -> Self {
        Self {
            start_interval_ms: config.start_interval.as_millis() as u64,
            max_interval_ms: config.max_interval.as_millis() as u64,
            max_elapsed_time_ms: config.max_elapsed_time.as_millis() as u64,
            multiplier: config.multiplier,
            jitter: config.jitter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_backoff_config_valid() {
        let config = BackoffConfig::new(ms(1), ms(5), ms(10)).unwrap();
        assert_eq!(config.start_interval(), ms(1));
        assert_eq!(config.max_interval(), ms(5));
        assert_eq!(config.max_elapsed_time(), ms(10));
        assert_eq!(config.multiplier(), DEFAULT_MULTIPLIER);
        assert_eq!(config.jitter(), 0.0);
    }

    #[test]
    fn test_backoff_config_start_exceeds_max() {
        let result = BackoffConfig::new(ms(10), ms(5), ms(100));
        assert!(matches!(result, Err(ConfigError::StartExceedsMax { .. })));
    }

    #[test]
    fn test_backoff_config_zero_intervals() {
        assert!(matches!(
            BackoffConfig::new(ms(0), ms(5), ms(10)),
            Err(ConfigError::NotPositive {
                field: "start_interval"
            })
        ));
        assert!(matches!(
            BackoffConfig::new(ms(1), ms(5), ms(0)),
            Err(ConfigError::NotPositive {
                field: "max_elapsed_time"
            })
        ));
    }

    #[test]
    fn test_backoff_config_invalid_multiplier_and_jitter() {
        let config = BackoffConfig::new(ms(1), ms(5), ms(10)).unwrap();
        assert!(matches!(
            config.with_multiplier(0.5),
            Err(ConfigError::InvalidMultiplier(_))
        ));
        assert!(matches!(
            config.with_jitter(1.5),
            Err(ConfigError::InvalidJitter(_))
        ));
        assert!(config.with_jitter(0.25).is_ok());
    }

    #[test]
    fn test_backoff_config_deserialize_validates() {
        let ok: BackoffConfig = serde_json::from_str(
            r#"{"start_interval_ms": 10, "max_interval_ms": 100, "max_elapsed_time_ms": 1000}"#,
        )
        .unwrap();
        assert_eq!(ok.max_interval(), ms(100));
        assert_eq!(ok.multiplier(), DEFAULT_MULTIPLIER);

        let bad = serde_json::from_str::<BackoffConfig>(
            r#"{"start_interval_ms": 500, "max_interval_ms": 100, "max_elapsed_time_ms": 1000}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_backoff_config_serialize_roundtrip() {
        let config = BackoffConfig::new(ms(20), ms(200), ms(2000))
            .unwrap()
            .with_jitter(0.5)
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"start_interval_ms\":20"));
        let back: BackoffConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_backoff_config_from_env_defaults() {
        assert_eq!(BackoffConfig::from_env().unwrap(), BackoffConfig::default());
    }
}
