//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur during telemetry operations.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize metrics.
    #[error("Failed to initialize metrics: {0}")]
    MetricsInit(String),

    /// Failed to initialize tracing.
    #[error("Failed to initialize tracing: {0}")]
    TracingInit(String),

    /// Failed to initialize logging.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to parse address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// A sink rejected a log record, span or metric sample.
    #[error("Telemetry sink '{sink}' failed: {message}")]
    Sink {
        /// Which sink failed (`logger`, `tracer`, `metrics`).
        sink: &'static str,
        /// What went wrong.
        message: String,
    },
}

impl TelemetryError {
    /// Creates a sink error.
    pub fn sink(sink: &'static str, message: impl Into<String>) -> Self {
        Self::Sink {
            sink,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::MetricsInit("failed".to_string());
        assert_eq!(err.to_string(), "Failed to initialize metrics: failed");
    }

    #[test]
    fn test_sink_error_display() {
        let err = TelemetryError::sink("tracer", "exporter queue full");
        assert_eq!(
            err.to_string(),
            "Telemetry sink 'tracer' failed: exporter queue full"
        );
    }
}
