//! Crate-level error type.
//!
//! Every terminal condition surfaces as its own variant so callers branch on
//! the kind of failure instead of matching on message text.

use std::time::Duration;

use dynakit_core::config::ConfigError;
use dynakit_core::lifecycle::{LifecycleError, PartialEmptyError};
use dynakit_core::marshal::MarshalError;
use dynakit_core::schema::SchemaError;
use dynakit_core::store::{ErrorCode, StoreError, StoreOperation};
use thiserror::Error;

/// Errors returned by the client, executor and lifecycle manager.
#[derive(Debug, Error)]
pub enum Error {
    /// A terminal store error, returned unmodified and never retried.
    #[error(transparent)]
    Store(StoreError),

    /// Transient failures continued past the elapsed-time budget.
    #[error("Retry budget exhausted for {operation} after {attempts} attempts in {elapsed:?}: {last}")]
    RetryBudgetExhausted {
        operation: StoreOperation,
        attempts: u32,
        elapsed: Duration,
        #[source]
        last: StoreError,
    },

    /// The caller's deadline fired or its cancellation token was triggered.
    #[error("Deadline exceeded during {operation}")]
    DeadlineExceeded { operation: StoreOperation },

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    MalformedSchemaTag(#[from] SchemaError),

    #[error(transparent)]
    Marshal(MarshalError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    PartialEmpty(#[from] Box<PartialEmptyError>),
}

impl Error {
    /// The store classification code behind this error, if any.
    pub fn store_code(&self) -> Option<ErrorCode> {
        match self {
            Error::Store(err) => Some(err.code),
            Error::RetryBudgetExhausted { last, .. } => Some(last.code),
            Error::PartialEmpty(partial) => Some(partial.source.code),
            _ => None,
        }
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Error::DeadlineExceeded { .. })
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Store(err)
    }
}

impl From<MarshalError> for Error {
    fn from(err: MarshalError) -> Self {
        match err {
            MarshalError::Schema(schema) => Error::MalformedSchemaTag(schema),
            other => Error::Marshal(other),
        }
    }
}

impl From<PartialEmptyError> for Error {
    fn from(err: PartialEmptyError) -> Self {
        Error::PartialEmpty(Box::new(err))
    }
}

/// Result type for dynakit operations.
pub type Result<T> = std::result::Result<T, Error>;
