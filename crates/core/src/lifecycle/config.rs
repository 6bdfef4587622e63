use std::time::Duration;

use crate::config::{env_millis, ConfigError, Result};
use crate::store::MAX_BATCH_DELETE_ITEMS;

/// Default delay between table status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Default limit on waiting for a table to become active.
pub const DEFAULT_ACTIVATION_TIMEOUT: Duration = Duration::from_secs(60);
/// Default number of items requested per scan page.
pub const DEFAULT_SCAN_PAGE_SIZE: usize = 100;

/// Configuration for the table lifecycle manager (validated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    poll_interval: Duration,
    timeout: Duration,
    scan_page_size: usize,
    delete_batch_limit: usize,
}

impl LifecycleConfig {
    /// Create and validate a config with default paging.
    pub fn new(poll_interval: Duration, timeout: Duration) -> Result<Self> {
        if poll_interval.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "poll_interval",
            });
        }
        if timeout.is_zero() {
            return Err(ConfigError::NotPositive { field: "timeout" });
        }
        Ok(Self {
            poll_interval,
            timeout,
            ..Self::default()
        })
    }

    pub fn with_scan_page_size(mut self, scan_page_size: usize) -> Result<Self> {
        if scan_page_size == 0 {
            return Err(ConfigError::NotPositive {
                field: "scan_page_size",
            });
        }
        self.scan_page_size = scan_page_size;
        Ok(self)
    }

    /// Sets how many keys go into one batch delete; capped by the store limit.
    pub fn with_delete_batch_limit(mut self, delete_batch_limit: usize) -> Result<Self> {
        if delete_batch_limit == 0 {
            return Err(ConfigError::NotPositive {
                field: "delete_batch_limit",
            });
        }
        if delete_batch_limit > MAX_BATCH_DELETE_ITEMS {
            return Err(ConfigError::TooLarge {
                field: "delete_batch_limit",
                value: delete_batch_limit,
                max: MAX_BATCH_DELETE_ITEMS,
            });
        }
        self.delete_batch_limit = delete_batch_limit;
        Ok(self)
    }

    /// Builds a config from `DYNAKIT_TABLE_POLL_MS` and
    /// `DYNAKIT_TABLE_TIMEOUT_MS`, falling back to the defaults.
    pub fn from_env() -> Result<Self> {
        Self::new(
            env_millis("DYNAKIT_TABLE_POLL_MS")?.unwrap_or(DEFAULT_POLL_INTERVAL),
            env_millis("DYNAKIT_TABLE_TIMEOUT_MS")?.unwrap_or(DEFAULT_ACTIVATION_TIMEOUT),
        )
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn scan_page_size(&self) -> usize {
        self.scan_page_size
    }

    pub fn delete_batch_limit(&self) -> usize {
        self.delete_batch_limit
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_ACTIVATION_TIMEOUT,
            scan_page_size: DEFAULT_SCAN_PAGE_SIZE,
            delete_batch_limit: MAX_BATCH_DELETE_ITEMS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_config_defaults() {
        let config = LifecycleConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.scan_page_size(), 100);
        assert_eq!(config.delete_batch_limit(), 25);
    }

    #[test]
    fn test_lifecycle_config_zero_poll_interval() {
        let result = LifecycleConfig::new(Duration::ZERO, Duration::from_secs(1));
        assert!(matches!(
            result,
            Err(ConfigError::NotPositive {
                field: "poll_interval"
            })
        ));
    }

    #[test]
    fn test_lifecycle_config_batch_limit_capped() {
        let config = LifecycleConfig::default();
        assert!(matches!(
            config.with_delete_batch_limit(26),
            Err(ConfigError::TooLarge { max: 25, .. })
        ));
        assert_eq!(
            config
                .with_delete_batch_limit(10)
                .unwrap()
                .delete_batch_limit(),
            10
        );
    }

    #[test]
    fn test_lifecycle_config_zero_page_size() {
        assert!(LifecycleConfig::default().with_scan_page_size(0).is_err());
    }

    #[test]
    fn test_lifecycle_config_from_env_defaults() {
        // Neither variable is set in the test environment.
        assert_eq!(
            LifecycleConfig::from_env().unwrap(),
            LifecycleConfig::default()
        );
    }
}
