mod config;
mod error;
mod planning;

pub use config::{
    LifecycleConfig, DEFAULT_ACTIVATION_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_SCAN_PAGE_SIZE,
};
pub use error::{LifecycleError, PartialEmptyError};
pub use planning::{delete_batches, plan_ensure, EnsurePlan};

/// Outcome of a successful empty operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmptyReport {
    /// Items deleted by this call.
    pub deleted: usize,
    /// Scan pages read.
    pub pages: usize,
}
