//! Structured logging.
//!
//! Installs a `tracing-subscriber` registry (JSON or pretty output) and
//! provides [`TracingLogger`], the production [`Logger`] sink that turns
//! log records into `tracing` events.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_telemetry::logging::{LogConfig, init_logging};
//!
//! init_logging(&LogConfig::production())?;
//! tracing::info!(command = "ping", "Handling command");
//! ```

use crate::error::TelemetryError;
use crate::sink::{find_attribute, Attribute, Logger};
use crate::TelemetryResult;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g. "info", "tessera::command=debug,warn").
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Log when `tracing` spans open and close.
    pub span_events: bool,

    /// Include the source file and line of each event.
    pub source_location: bool,

    /// Service name for log fields.
    pub service_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Pretty output at debug level, with span events and source locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            span_events: true,
            source_location: true,
            ..Self::production()
        }
    }

    /// JSON output at info level.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            span_events: false,
            source_location: false,
            service_name: "tessera".to_string(),
        }
    }
}

/// Initializes the global `tracing` subscriber.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the filter is invalid or a
/// global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_span_events(span_events)
        .with_file(config.source_location)
        .with_line_number(config.source_location);
    let fmt_layer = match config.format {
        LogFormat::Json => fmt_layer.json().boxed(),
        LogFormat::Pretty => fmt_layer.pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::debug!(service = %config.service_name, format = ?config.format, "Logging initialized");
    Ok(())
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns error if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))
}

/// Standard field names used in command telemetry.
pub mod fields {
    /// Command-type label.
    pub const COMMAND: &str = "command";

    /// Request ID.
    pub const REQUEST_ID: &str = "request_id";

    /// Invocation outcome (`success`, `failure`, `cancelled`).
    pub const OUTCOME: &str = "outcome";

    /// Elapsed time in milliseconds.
    pub const DURATION_MS: &str = "duration_ms";

    /// Error kind (`command`, `cancelled`, `deadline_exceeded`, `internal`).
    pub const ERROR_KIND: &str = "error_kind";

    /// Error message.
    pub const ERROR: &str = "error";

    /// Span entry time (RFC 3339).
    pub const ENTERED_AT: &str = "entered_at";
}

/// [`Logger`] that emits `tracing` events.
///
/// The `command` attribute becomes its own event field so log pipelines can
/// index on it; the full attribute list is rendered as a JSON object in the
/// `attributes` field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl TracingLogger {
    /// Creates a new logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Renders attributes as a JSON object string.
pub(crate) fn render_attributes(attributes: &[Attribute]) -> TelemetryResult<String> {
    let mut map = serde_json::Map::with_capacity(attributes.len());
    for attribute in attributes {
        let value = serde_json::to_value(&attribute.value)
            .map_err(|e| TelemetryError::sink("logger", e.to_string()))?;
        map.insert(attribute.key.to_string(), value);
    }
    Ok(serde_json::Value::Object(map).to_string())
}

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str, attributes: &[Attribute]) -> TelemetryResult<()> {
        let rendered = render_attributes(attributes)?;
        let command = find_attribute(attributes, fields::COMMAND).map(ToString::to_string);
        let command = command.as_deref();

        match level {
            Level::ERROR => {
                tracing::error!(target: "tessera::command", command, attributes = %rendered, "{message}");
            }
            Level::WARN => {
                tracing::warn!(target: "tessera::command", command, attributes = %rendered, "{message}");
            }
            Level::INFO => {
                tracing::info!(target: "tessera::command", command, attributes = %rendered, "{message}");
            }
            Level::DEBUG => {
                tracing::debug!(target: "tessera::command", command, attributes = %rendered, "{message}");
            }
            _ => {
                tracing::trace!(target: "tessera::command", command, attributes = %rendered, "{message}");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_production() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
        assert!(!config.source_location);
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.span_events);
        assert!(config.source_location);
        assert_eq!(config.level, "debug");
        assert_eq!(config.service_name, "tessera");
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("tessera::command=debug,warn").is_ok());
        assert!(matches!(
            create_env_filter("tessera=notalevel"),
            Err(TelemetryError::LoggingInit(_))
        ));
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_render_attributes() {
        let rendered = render_attributes(&[
            Attribute::new(fields::COMMAND, "ping"),
            Attribute::new(fields::DURATION_MS, 5.0),
        ])
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["command"], "ping");
        assert_eq!(value["duration_ms"], 5.0);
    }

    #[test]
    fn test_tracing_logger_accepts_every_level() {
        let logger = TracingLogger::new();
        let attrs = [Attribute::new(fields::COMMAND, "ping")];
        for level in [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE] {
            assert!(logger.log(level, "command finished", &attrs).is_ok());
        }
    }
}
