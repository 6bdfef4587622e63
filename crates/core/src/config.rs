//! Configuration errors and environment helpers shared by validated configs.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while constructing a configuration. Always fatal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("start interval ({start:?}) must not exceed max interval ({max:?})")]
    StartExceedsMax { start: Duration, max: Duration },

    #[error("multiplier must be at least 1.0, got {0}")]
    InvalidMultiplier(f64),

    #[error("jitter must be within [0, 1], got {0}")]
    InvalidJitter(f64),

    #[error("{field} must be at most {max}, got {value}")]
    TooLarge {
        field: &'static str,
        value: usize,
        max: usize,
    },

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Reads a millisecond duration from the environment.
///
/// Unset variables yield `None`; unparsable values are an error.
pub fn env_millis(var: &'static str) -> Result<Option<Duration>> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        Err(_) => Ok(None),
    }
}

/// Reads a floating-point value from the environment.
pub fn env_f64(var: &'static str) -> Result<Option<f64>> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_millis_unset() {
        assert_eq!(env_millis("DYNAKIT_TEST_UNSET_VARIABLE").unwrap(), None);
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::StartExceedsMax {
            start: Duration::from_secs(2),
            max: Duration::from_secs(1),
        };
        assert_eq!(
            error.to_string(),
            "start interval (2s) must not exceed max interval (1s)"
        );
    }
}
