mod config;
mod policy;

pub use config::{
    BackoffConfig, BackoffSettings, DEFAULT_MAX_ELAPSED_TIME, DEFAULT_MAX_INTERVAL,
    DEFAULT_MULTIPLIER, DEFAULT_START_INTERVAL,
};
pub use policy::BackoffPolicy;
