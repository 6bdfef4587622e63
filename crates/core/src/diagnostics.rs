//! Diagnostics collaborator contract.
//!
//! The data-access layer reports through this trait purely for
//! observability; reports never replace the typed errors returned to callers.

use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A structured error record with environment and source-location metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub environment: String,
    pub component: String,
    pub file: &'static str,
    pub line: u32,
    pub message: String,
    pub inner: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorReport {
    pub fn new(
        environment: impl Into<String>,
        component: impl Into<String>,
        location: &'static Location<'static>,
        message: impl Into<String>,
        inner: &(dyn StdError + 'static),
    ) -> Self {
        Self {
            environment: environment.into(),
            component: component.into(),
            file: location.file(),
            line: location.line(),
            message: message.into(),
            inner: inner.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Serializes the report as a single JSON line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.to_string())
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}][{}] {}:{}: {}, Inner: {}",
            self.environment, self.component, self.file, self.line, self.message, self.inner
        )
    }
}

/// Sink for informational messages and structured error reports.
pub trait Diagnostics: Send + Sync {
    /// Records an informational message.
    fn log(&self, message: &str);

    /// Records a failure and returns the structured report that was emitted.
    fn report_error(
        &self,
        inner: &(dyn StdError + 'static),
        message: &str,
        location: &'static Location<'static>,
    ) -> ErrorReport;
}

/// Diagnostics sink that records nothing. Useful in tests.
#[derive(Debug, Clone, Default)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {
    fn log(&self, _message: &str) {}

    fn report_error(
        &self,
        inner: &(dyn StdError + 'static),
        message: &str,
        location: &'static Location<'static>,
    ) -> ErrorReport {
        ErrorReport::new("none", "noop", location, message, inner)
    }
}
