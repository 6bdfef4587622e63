//! Diagnostics sink backed by `tracing`.

use std::error::Error as StdError;
use std::panic::Location;

use dynakit_core::diagnostics::{Diagnostics, ErrorReport};

/// Forwards messages and error reports to `tracing` events.
///
/// Every event carries the configured environment and component so the
/// subscriber can route or filter on them.
#[derive(Debug, Clone)]
pub struct TracingDiagnostics {
    environment: String,
    component: String,
}

impl TracingDiagnostics {
    pub fn new(environment: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            component: component.into(),
        }
    }

    /// Reads the environment name from `DYNAKIT_ENV`, defaulting to `development`.
    pub fn from_env(component: impl Into<String>) -> Self {
        let environment =
            std::env::var("DYNAKIT_ENV").unwrap_or_else(|_| "development".to_string());
        Self::new(environment, component)
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn component(&self) -> &str {
        &self.component
    }
}

impl Default for TracingDiagnostics {
    fn default() -> Self {
        Self::new("development", "dynakit")
    }
}

impl Diagnostics for TracingDiagnostics {
    fn log(&self, message: &str) {
        tracing::info!(
            environment = %self.environment,
            component = %self.component,
            "{message}"
        );
    }

    fn report_error(
        &self,
        inner: &(dyn StdError + 'static),
        message: &str,
        location: &'static Location<'static>,
    ) -> ErrorReport {
        let report = ErrorReport::new(
            self.environment.as_str(),
            self.component.as_str(),
            location,
            message,
            inner,
        );
        tracing::error!(
            environment = %report.environment,
            component = %report.component,
            file = report.file,
            line = report.line,
            inner = %report.inner,
            "{}",
            report.message
        );
        report
    }
}
