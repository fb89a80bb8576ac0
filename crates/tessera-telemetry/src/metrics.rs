//! Prometheus metrics.
//!
//! # Command Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `<ns>_commands_total` | Counter | `command`, `outcome` | Handled commands |
//! | `<ns>_command_duration_seconds` | Histogram | `command`, `outcome` | Handler latency |
//!
//! `<ns>` is the configured namespace, `tessera` by default.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_telemetry::metrics::{init_metrics, render_metrics, MetricsConfig};
//!
//! init_metrics(&MetricsConfig::default())?;
//! println!("{}", render_metrics().unwrap_or_default());
//! ```

use crate::error::TelemetryError;
use crate::sink::{Labels, MetricsRecorder};
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram, Label};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Default metric namespace.
pub const DEFAULT_NAMESPACE: &str = "tessera";

/// Returns the command counter name for `namespace`.
#[must_use]
pub fn commands_total(namespace: &str) -> String {
    format!("{namespace}_commands_total")
}

/// Returns the command latency histogram name for `namespace`.
#[must_use]
pub fn command_duration_seconds(namespace: &str) -> String {
    format!("{namespace}_command_duration_seconds")
}

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090").
    pub addr: String,

    /// Service name for metric labels.
    pub service_name: String,

    /// Prefix of every metric name.
    pub namespace: String,

    /// Histogram buckets for command duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: "0.0.0.0:9090".to_string(),
            service_name: "tessera".to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            // 100us .. 10s; most commands finish in single-digit milliseconds
            duration_buckets: vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
                10.0,
            ],
        }
    }
}

/// Initializes the Prometheus exporter and installs it as the global
/// `metrics` recorder.
///
/// Must be called from within a Tokio runtime: the HTTP listener is
/// spawned onto it.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for a bad listen address and
/// `TelemetryError::MetricsInit` if the exporter cannot be built or a
/// global recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(command_duration_seconds(&config.namespace)),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))?
        .build()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    let _ = METRICS_HANDLE.set(handle);

    tokio::spawn(async move {
        if let Err(e) = exporter.await {
            tracing::warn!(error = ?e, "Prometheus exporter stopped");
        }
    });

    describe_command_metrics(&config.namespace);
    tracing::info!(%addr, namespace = %config.namespace, "Metrics exporter listening");

    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Registers descriptions for the command metrics.
pub fn describe_command_metrics(namespace: &str) {
    describe_counter!(
        commands_total(namespace),
        "Total number of commands handled, by command and outcome"
    );
    describe_histogram!(
        command_duration_seconds(namespace),
        metrics::Unit::Seconds,
        "Command handler latency in seconds, by command and outcome"
    );
}

/// [`MetricsRecorder`] backed by the global `metrics` facade.
///
/// Before a global recorder is installed the `metrics` crate drops samples
/// silently, so this sink never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsCrateRecorder;

impl MetricsCrateRecorder {
    /// Creates a new recorder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn to_labels(labels: &Labels) -> Vec<Label> {
    labels
        .iter()
        .map(|(key, value)| Label::new(*key, value.clone()))
        .collect()
}

impl MetricsRecorder for MetricsCrateRecorder {
    fn increment_counter(&self, name: &str, labels: &Labels) -> TelemetryResult<()> {
        counter!(name.to_string(), to_labels(labels)).increment(1);
        Ok(())
    }

    fn observe_histogram(&self, name: &str, value: f64, labels: &Labels) -> TelemetryResult<()> {
        histogram!(name.to_string(), to_labels(labels)).record(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9090");
        assert_eq!(config.namespace, "tessera");
        assert!(config.duration_buckets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_metric_names() {
        assert_eq!(commands_total("tessera"), "tessera_commands_total");
        assert_eq!(
            command_duration_seconds("ferret"),
            "ferret_command_duration_seconds"
        );
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            addr: "not-an-address".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_disabled_metrics() {
        let config = MetricsConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_render_before_init() {
        assert!(render_metrics().is_none());
    }

    #[test]
    fn test_recorder_without_global_does_not_fail() {
        let recorder = MetricsCrateRecorder::new();
        let labels = [("command", "ping".to_string()), ("outcome", "success".to_string())];
        assert!(recorder.increment_counter("tessera_commands_total", &labels).is_ok());
        assert!(recorder
            .observe_histogram("tessera_command_duration_seconds", 0.005, &labels)
            .is_ok());
    }
}
