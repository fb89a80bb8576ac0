//! Telemetry backends for Tessera.
//!
//! This crate owns the concrete observability stack and the sink interfaces
//! middleware writes to:
//!
//! - **Logging**: `tracing-subscriber` with JSON or pretty output
//! - **Metrics**: Prometheus exposition via the `metrics` crate
//! - **Tracing**: OpenTelemetry spans exported over OTLP
//!
//! # Architecture
//!
//! ```text
//!   ObservabilityMiddleware
//!            │
//!            ▼
//!   ┌──────────────────── TelemetrySinks ────────────────────┐
//!   │  Logger              Tracer              MetricsRecorder│
//!   └────┬───────────────────┬──────────────────────┬────────┘
//!        ▼                   ▼                      ▼
//!   TracingLogger        OtelTracer          MetricsCrateRecorder
//!        │                   │                      │
//!        ▼                   ▼                      ▼
//!   stdout (JSON)      OTLP collector       Prometheus /metrics
//! ```
//!
//! Tests swap in [`memory::MemorySinks`] to assert on exact emissions.
//!
//! # Command Metrics
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `tessera_commands_total` | Counter | `command`, `outcome` |
//! | `tessera_command_duration_seconds` | Histogram | `command`, `outcome` |
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TelemetryConfig::builder()
//!         .service_name("docdb")
//!         .metrics_addr("0.0.0.0:9090")
//!         .otlp_endpoint("http://localhost:4317")
//!         .build();
//!
//!     let guard = init_telemetry(config)?;
//!     // the sinks carry the configured namespace
//!     let sinks = guard.sinks();
//!     // hand `sinks` to ObservabilityMiddleware ...
//!     guard.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod memory;
pub mod metrics;
pub mod sink;
pub mod tracing;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{fields, init_logging, LogConfig, LogFormat, TracingLogger};
pub use memory::{FailingSink, MemoryLogger, MemoryMetrics, MemorySinks, MemoryTracer};
pub use metrics::{init_metrics, render_metrics, MetricsConfig, MetricsCrateRecorder};
pub use sink::{
    Attribute, AttributeValue, Labels, Logger, MetricsRecorder, NoopSpan, Span, SpanStatus,
    TelemetrySinks, Tracer,
};
pub use tracing::{in_span, init_tracing, OtelTracer, TracingConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Keeps the installed backends alive.
///
/// Hold the guard for the lifetime of the process. Dropping it (or calling
/// [`TelemetryGuard::shutdown`]) flushes pending spans and shuts the tracer
/// provider down.
pub struct TelemetryGuard {
    service_name: String,
    namespace: String,
    tracer_provider: Option<opentelemetry_sdk::trace::TracerProvider>,
}

impl TelemetryGuard {
    /// Creates a guard for backends installed from `config`.
    #[must_use]
    pub fn new(
        config: &TelemetryConfig,
        tracer_provider: Option<opentelemetry_sdk::trace::TracerProvider>,
    ) -> Self {
        Self {
            service_name: config.service_name.clone(),
            namespace: config.namespace.clone(),
            tracer_provider,
        }
    }

    /// Returns sinks that write to the installed backends, under the
    /// configured service name and metric namespace.
    #[must_use]
    pub fn sinks(&self) -> TelemetrySinks {
        TelemetrySinks::production(self.service_name.clone()).with_namespace(&self.namespace)
    }

    /// Flushes and shuts down explicitly.
    pub fn shutdown(mut self) {
        self.flush_and_shutdown();
    }

    fn flush_and_shutdown(&mut self) {
        let Some(provider) = self.tracer_provider.take() else {
            return;
        };
        for result in provider.force_flush() {
            if let Err(e) = result {
                ::tracing::warn!(error = %e, "Failed to flush tracer provider");
            }
        }
        if let Err(e) = provider.shutdown() {
            ::tracing::warn!(error = %e, "Failed to shut down tracer provider");
        }
    }
}

impl std::fmt::Debug for TelemetryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryGuard")
            .field("service_name", &self.service_name)
            .field("namespace", &self.namespace)
            .field("tracing", &self.tracer_provider.is_some())
            .finish()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        self.flush_and_shutdown();
    }
}

/// Initializes logging, metrics and tracing, in that order.
///
/// Metrics and tracing spawn background work, so this must run inside a
/// Tokio runtime when either is enabled.
///
/// # Errors
///
/// Returns the first [`TelemetryError`] raised by a subsystem.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryResult<TelemetryGuard> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    let tracer_provider = init_tracing(&config.tracing)?;

    ::tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = %config.environment,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard::new(&config, tracer_provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_without_provider() {
        let guard = TelemetryGuard::new(&TelemetryConfig::default(), None);
        assert!(format!("{guard:?}").contains("tracing: false"));
        guard.shutdown();
    }

    #[test]
    fn test_guard_sinks_are_usable() {
        let guard = TelemetryGuard::new(&TelemetryConfig::default(), None);
        let sinks = guard.sinks();
        assert!(sinks
            .logger
            .log(::tracing::Level::INFO, "ready", &[])
            .is_ok());
        assert!(sinks
            .metrics
            .increment_counter("tessera_commands_total", &[])
            .is_ok());
    }

    #[test]
    fn test_guard_sinks_carry_namespace() {
        let config = TelemetryConfig::builder()
            .service_name("docdb")
            .namespace("docdb")
            .build();
        let guard = TelemetryGuard::new(&config, None);

        assert_eq!(guard.sinks().namespace, "docdb");
        assert_eq!(config.metrics.namespace, guard.sinks().namespace);
        assert!(format!("{guard:?}").contains("namespace: \"docdb\""));
    }

    #[test]
    fn test_init_with_everything_disabled() {
        let mut config = TelemetryConfig::development();
        config.logging.enabled = false;
        let guard = init_telemetry(config).unwrap();
        drop(guard);
    }
}
