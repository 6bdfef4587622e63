use std::fmt;

use thiserror::Error;

use super::StoreOperation;

/// Whether a failure may succeed if the same call is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Terminal,
}

/// Machine-readable classification carried by every store error.
///
/// Backends map their native failures onto these codes at the adapter
/// boundary; nothing downstream inspects error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Throttled,
    Timeout,
    Transport,
    ServiceUnavailable,
    InternalServer,
    ResourceNotFound,
    Validation,
    ConditionalCheckFailed,
    Conflict,
    AccessDenied,
    Unknown,
}

impl ErrorCode {
    pub fn class(&self) -> ErrorClass {
        match self {
            ErrorCode::Throttled
            | ErrorCode::Timeout
            | ErrorCode::Transport
            | ErrorCode::ServiceUnavailable
            | ErrorCode::InternalServer => ErrorClass::Transient,
            ErrorCode::ResourceNotFound
            | ErrorCode::Validation
            | ErrorCode::ConditionalCheckFailed
            | ErrorCode::Conflict
            | ErrorCode::AccessDenied
            | ErrorCode::Unknown => ErrorClass::Terminal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Throttled => "Throttled",
            ErrorCode::Timeout => "Timeout",
            ErrorCode::Transport => "Transport",
            ErrorCode::ServiceUnavailable => "ServiceUnavailable",
            ErrorCode::InternalServer => "InternalServer",
            ErrorCode::ResourceNotFound => "ResourceNotFound",
            ErrorCode::Validation => "Validation",
            ErrorCode::ConditionalCheckFailed => "ConditionalCheckFailed",
            ErrorCode::Conflict => "Conflict",
            ErrorCode::AccessDenied => "AccessDenied",
            ErrorCode::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned by the abstract store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{operation} failed ({code}): {message}")]
pub struct StoreError {
    pub operation: StoreOperation,
    pub code: ErrorCode,
    pub message: String,
}

impl StoreError {
    pub fn new(operation: StoreOperation, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            operation,
            code,
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        self.code.class()
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    pub fn is_terminal(&self) -> bool {
        self.class() == ErrorClass::Terminal
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_codes() {
        for code in [
            ErrorCode::Throttled,
            ErrorCode::Timeout,
            ErrorCode::Transport,
            ErrorCode::ServiceUnavailable,
            ErrorCode::InternalServer,
        ] {
            assert_eq!(code.class(), ErrorClass::Transient, "{code}");
        }
    }

    #[test]
    fn test_terminal_codes() {
        for code in [
            ErrorCode::ResourceNotFound,
            ErrorCode::Validation,
            ErrorCode::ConditionalCheckFailed,
            ErrorCode::Conflict,
            ErrorCode::AccessDenied,
            ErrorCode::Unknown,
        ] {
            assert_eq!(code.class(), ErrorClass::Terminal, "{code}");
        }
    }

    #[test]
    fn test_store_error_display() {
        let error = StoreError::new(
            StoreOperation::PutItem,
            ErrorCode::ResourceNotFound,
            "Requested resource not found",
        );
        assert_eq!(
            error.to_string(),
            "PutItem failed (ResourceNotFound): Requested resource not found"
        );
        assert!(error.is_terminal());
    }
}
