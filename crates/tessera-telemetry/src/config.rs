//! Telemetry configuration.
//!
//! One [`TelemetryConfig`] carries the logging, metrics and tracing
//! settings. The builder keeps the service identity consistent across the
//! three subsystems.

use crate::logging::LogConfig;
use crate::metrics::{MetricsConfig, DEFAULT_NAMESPACE};
use crate::tracing::TracingConfig;

/// Configuration for logging, metrics and tracing.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name reported by every backend.
    pub service_name: String,

    /// Service version.
    pub service_version: String,

    /// Deployment environment (production, staging, development).
    pub environment: String,

    /// Metric name prefix.
    pub namespace: String,

    /// Metrics settings.
    pub metrics: MetricsConfig,

    /// Tracing settings.
    pub tracing: TracingConfig,

    /// Logging settings.
    pub logging: LogConfig,
}

impl TelemetryConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::new()
    }

    /// Local development: pretty logs, no exporters.
    #[must_use]
    pub fn development() -> Self {
        Self::builder()
            .logging(LogConfig::development())
            .metrics(MetricsConfig {
                enabled: false,
                ..MetricsConfig::default()
            })
            .tracing(TracingConfig {
                enabled: false,
                ..TracingConfig::default()
            })
            .build()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "tessera".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            metrics: MetricsConfig::default(),
            tracing: TracingConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Builder for [`TelemetryConfig`].
#[derive(Debug, Default)]
pub struct TelemetryConfigBuilder {
    service_name: Option<String>,
    service_version: Option<String>,
    environment: Option<String>,
    namespace: Option<String>,
    metrics: Option<MetricsConfig>,
    tracing: Option<TracingConfig>,
    logging: Option<LogConfig>,
}

impl TelemetryConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service name.
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Sets the service version.
    #[must_use]
    pub fn service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    /// Sets the environment.
    #[must_use]
    pub fn environment(mut self, env: impl Into<String>) -> Self {
        self.environment = Some(env.into());
        self
    }

    /// Sets the metric name prefix.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Replaces the metrics settings.
    #[must_use]
    pub fn metrics(mut self, config: MetricsConfig) -> Self {
        self.metrics = Some(config);
        self
    }

    /// Replaces the tracing settings.
    #[must_use]
    pub fn tracing(mut self, config: TracingConfig) -> Self {
        self.tracing = Some(config);
        self
    }

    /// Replaces the logging settings.
    #[must_use]
    pub fn logging(mut self, config: LogConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// Enables the Prometheus listener on `addr`.
    #[must_use]
    pub fn metrics_addr(mut self, addr: impl Into<String>) -> Self {
        let config = self.metrics.take().unwrap_or_default();
        self.metrics = Some(MetricsConfig {
            enabled: true,
            addr: addr.into(),
            ..config
        });
        self
    }

    /// Enables OTLP export to `endpoint`.
    #[must_use]
    pub fn otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let config = self.tracing.take().unwrap_or_default();
        self.tracing = Some(TracingConfig {
            enabled: true,
            otlp_endpoint: endpoint.into(),
            ..config
        });
        self
    }

    /// Sets the log filter directive.
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        let config = self.logging.take().unwrap_or_default();
        self.logging = Some(LogConfig {
            level: level.into(),
            ..config
        });
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        let defaults = TelemetryConfig::default();

        let service_name = self.service_name.unwrap_or(defaults.service_name);
        let service_version = self.service_version.unwrap_or(defaults.service_version);
        let environment = self.environment.unwrap_or(defaults.environment);
        let namespace = self.namespace.unwrap_or(defaults.namespace);

        let mut metrics = self.metrics.unwrap_or(defaults.metrics);
        metrics.service_name.clone_from(&service_name);
        metrics.namespace.clone_from(&namespace);

        let mut tracing = self.tracing.unwrap_or(defaults.tracing);
        tracing.service_name.clone_from(&service_name);
        tracing.service_version.clone_from(&service_version);
        tracing.environment.clone_from(&environment);

        let mut logging = self.logging.unwrap_or(defaults.logging);
        logging.service_name.clone_from(&service_name);

        TelemetryConfig {
            service_name,
            service_version,
            environment,
            namespace,
            metrics,
            tracing,
            logging,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "tessera");
        assert_eq!(config.namespace, "tessera");
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_builder_propagates_identity() {
        let config = TelemetryConfig::builder()
            .service_name("docdb")
            .service_version("2.0.0")
            .environment("production")
            .namespace("docdb")
            .build();

        assert_eq!(config.metrics.service_name, "docdb");
        assert_eq!(config.metrics.namespace, "docdb");
        assert_eq!(config.tracing.service_name, "docdb");
        assert_eq!(config.tracing.service_version, "2.0.0");
        assert_eq!(config.tracing.environment, "production");
        assert_eq!(config.logging.service_name, "docdb");
    }

    #[test]
    fn test_builder_endpoints() {
        let config = TelemetryConfig::builder()
            .metrics_addr("127.0.0.1:9999")
            .otlp_endpoint("http://collector:4317")
            .log_level("tessera=debug")
            .build();

        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.addr, "127.0.0.1:9999");
        assert!(config.tracing.enabled);
        assert_eq!(config.tracing.otlp_endpoint, "http://collector:4317");
        assert_eq!(config.logging.level, "tessera=debug");
    }

    #[test]
    fn test_development_disables_exporters() {
        let config = TelemetryConfig::development();
        assert!(!config.metrics.enabled);
        assert!(!config.tracing.enabled);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }
}
