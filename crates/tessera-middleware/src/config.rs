//! Observability middleware configuration.

use tessera_telemetry::metrics::{command_duration_seconds, commands_total, DEFAULT_NAMESPACE};

/// Default cap on command label length, in bytes.
pub const DEFAULT_MAX_LABEL_LEN: usize = 64;

/// Settings for [`ObservabilityMiddleware`](crate::ObservabilityMiddleware).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// Metric name prefix.
    pub namespace: String,

    /// Command labels longer than this collapse to `unknown`.
    pub max_label_len: usize,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            max_label_len: DEFAULT_MAX_LABEL_LEN,
        }
    }
}

impl ObservabilityConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ObservabilityConfigBuilder {
        ObservabilityConfigBuilder::default()
    }

    /// Name of the command counter.
    #[must_use]
    pub fn counter_name(&self) -> String {
        commands_total(&self.namespace)
    }

    /// Name of the command latency histogram.
    #[must_use]
    pub fn histogram_name(&self) -> String {
        command_duration_seconds(&self.namespace)
    }
}

/// Builder for [`ObservabilityConfig`].
#[derive(Debug, Default)]
pub struct ObservabilityConfigBuilder {
    namespace: Option<String>,
    max_label_len: Option<usize>,
}

impl ObservabilityConfigBuilder {
    /// Sets the metric name prefix.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the maximum command label length.
    #[must_use]
    pub fn max_label_len(mut self, len: usize) -> Self {
        self.max_label_len = Some(len);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ObservabilityConfig {
        let defaults = ObservabilityConfig::default();
        ObservabilityConfig {
            namespace: self.namespace.unwrap_or(defaults.namespace),
            max_label_len: self.max_label_len.unwrap_or(defaults.max_label_len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.namespace, "tessera");
        assert_eq!(config.max_label_len, 64);
        assert_eq!(config.counter_name(), "tessera_commands_total");
        assert_eq!(config.histogram_name(), "tessera_command_duration_seconds");
    }

    #[test]
    fn test_builder() {
        let config = ObservabilityConfig::builder()
            .namespace("docdb")
            .max_label_len(16)
            .build();
        assert_eq!(config.counter_name(), "docdb_commands_total");
        assert_eq!(config.max_label_len, 16);
    }
}
