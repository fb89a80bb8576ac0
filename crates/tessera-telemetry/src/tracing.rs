//! OpenTelemetry distributed tracing.
//!
//! [`init_tracing`] installs a global tracer provider exporting over OTLP;
//! [`OtelTracer`] is the production [`Tracer`] sink built on the global
//! tracer. [`in_span`] runs a future with a sink span active, so spans the
//! future starts nest under it.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_telemetry::tracing::{init_tracing, TracingConfig};
//!
//! let provider = init_tracing(&TracingConfig::default())?;
//! ```

use crate::error::TelemetryError;
use crate::sink::{Attribute, AttributeValue, Span, SpanStatus, Tracer};
use crate::TelemetryResult;
use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::trace::{
    FutureExt as _, SpanKind, Status, TraceContextExt as _, Tracer as _,
    TracerProvider as _, WithContext,
};
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, TracerProvider};
use opentelemetry_sdk::Resource;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Whether tracing is enabled.
    pub enabled: bool,

    /// OTLP endpoint (e.g., `http://localhost:4317`).
    pub otlp_endpoint: String,

    /// Service name for spans.
    pub service_name: String,

    /// Service version.
    pub service_version: String,

    /// Deployment environment.
    pub environment: String,

    /// Sampling ratio (0.0 to 1.0).
    pub sample_ratio: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: "tessera".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            sample_ratio: 1.0,
        }
    }
}

impl TracingConfig {
    /// Creates a production configuration with lower sampling.
    #[must_use]
    pub fn production(service_name: &str, version: &str) -> Self {
        Self {
            enabled: true,
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: service_name.to_string(),
            service_version: version.to_string(),
            environment: "production".to_string(),
            sample_ratio: 0.1,
        }
    }

    fn sampler(&self) -> Sampler {
        if self.sample_ratio >= 1.0 {
            Sampler::AlwaysOn
        } else if self.sample_ratio <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(self.sample_ratio)
        }
    }
}

/// Initializes the global tracer provider.
///
/// Returns the provider so the caller can flush and shut it down; `None`
/// when tracing is disabled.
///
/// # Errors
///
/// Returns `TelemetryError::TracingInit` if the exporter cannot be built.
pub fn init_tracing(config: &TracingConfig) -> TelemetryResult<Option<TracerProvider>> {
    if !config.enabled {
        return Ok(None);
    }

    let resource = Resource::new([
        KeyValue::new(
            opentelemetry_semantic_conventions::attribute::SERVICE_NAME,
            config.service_name.clone(),
        ),
        KeyValue::new(
            opentelemetry_semantic_conventions::attribute::SERVICE_VERSION,
            config.service_version.clone(),
        ),
        KeyValue::new("deployment.environment", config.environment.clone()),
    ]);

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()
        .map_err(|e| TelemetryError::TracingInit(e.to_string()))?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_sampler(config.sampler())
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .build();

    global::set_tracer_provider(provider.clone());
    tracing::info!(endpoint = %config.otlp_endpoint, "OTLP trace export enabled");

    Ok(Some(provider))
}

fn to_key_value(attribute: &Attribute) -> KeyValue {
    match &attribute.value {
        AttributeValue::String(s) => KeyValue::new(attribute.key, s.clone()),
        AttributeValue::Int(i) => KeyValue::new(attribute.key, *i),
        AttributeValue::Float(f) => KeyValue::new(attribute.key, *f),
        AttributeValue::Bool(b) => KeyValue::new(attribute.key, *b),
    }
}

/// Runs `future` with `span` as the active OpenTelemetry span.
pub fn in_span<F: Future>(span: &dyn Span, future: F) -> WithContext<F> {
    future.with_context(span.context())
}

/// [`Tracer`] backed by an OpenTelemetry tracer.
///
/// Spans are started with kind `Server`, as children of the current
/// context. Until a global provider is installed the global tracer is a
/// no-op, which keeps this sink safe to use in tests.
pub struct OtelTracer {
    tracer: BoxedTracer,
}

impl OtelTracer {
    /// Creates a tracer on the global provider with the given
    /// instrumentation scope name.
    #[must_use]
    pub fn new(scope: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tracer: global::tracer(scope),
        }
    }

    /// Creates a tracer on an explicit provider instead of the global one.
    #[must_use]
    pub fn with_provider(provider: &TracerProvider, scope: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tracer: BoxedTracer::new(Box::new(provider.tracer(scope))),
        }
    }
}

impl fmt::Debug for OtelTracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtelTracer").finish_non_exhaustive()
    }
}

impl Tracer for OtelTracer {
    fn start_span(&self, name: &str, attributes: &[Attribute]) -> TelemetryResult<Box<dyn Span>> {
        let span = self
            .tracer
            .span_builder(name.to_string())
            .with_kind(SpanKind::Server)
            .with_attributes(attributes.iter().map(to_key_value))
            .start(&self.tracer);

        Ok(Box::new(OtelSpan {
            cx: Context::current_with_span(span),
        }))
    }
}

/// A span started by [`OtelTracer`], held in the context it is active in.
struct OtelSpan {
    cx: Context,
}

impl Span for OtelSpan {
    fn set_attribute(&mut self, attribute: Attribute) {
        self.cx.span().set_attribute(to_key_value(&attribute));
    }

    fn end(
        self: Box<Self>,
        status: SpanStatus,
        error: Option<&(dyn std::error::Error + 'static)>,
    ) -> TelemetryResult<()> {
        let span = self.cx.span();
        match status {
            SpanStatus::Ok => span.set_status(Status::Ok),
            SpanStatus::Error => {
                let description = error.map_or_else(|| "error".to_string(), ToString::to_string);
                span.set_status(Status::error(description));
            }
        }
        if let Some(err) = error {
            span.record_error(err);
        }
        span.end();
        Ok(())
    }

    fn context(&self) -> Context {
        self.cx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::TraceContextExt;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert!(config.enabled);
        assert_eq!(config.sample_ratio, 1.0);
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_production_config() {
        let config = TracingConfig::production("docdb", "1.0.0");
        assert_eq!(config.sample_ratio, 0.1);
        assert_eq!(config.environment, "production");
        assert_eq!(config.service_name, "docdb");
    }

    #[test]
    fn test_sampler_selection() {
        let mut config = TracingConfig::default();
        assert!(matches!(config.sampler(), Sampler::AlwaysOn));
        config.sample_ratio = 0.0;
        assert!(matches!(config.sampler(), Sampler::AlwaysOff));
        config.sample_ratio = 0.25;
        assert!(matches!(config.sampler(), Sampler::TraceIdRatioBased(r) if r == 0.25));
    }

    #[test]
    fn test_disabled_tracing() {
        let config = TracingConfig {
            enabled: false,
            ..Default::default()
        };

        let result = init_tracing(&config);
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_otel_tracer_without_provider() {
        let tracer = OtelTracer::new("tessera-test");
        let mut span = tracer
            .start_span("ping", &[Attribute::new("command", "ping")])
            .unwrap();
        span.set_attribute(Attribute::new("outcome", "failure"));
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(span.end(SpanStatus::Error, Some(&err)).is_ok());
    }

    #[tokio::test]
    async fn test_in_span_parents_inner_spans() {
        let provider = TracerProvider::builder().build();
        let tracer = OtelTracer::with_provider(&provider, "tessera-test");

        let command = tracer.start_span("find", &[]).unwrap();
        let parent = command.context().span().span_context().clone();
        assert!(parent.is_valid());

        let (active, child) = in_span(command.as_ref(), async {
            let active = Context::current().span().span_context().clone();
            let child = tracer.start_span("storage.scan", &[]).unwrap();
            let child_cx = child.context();
            (active, child_cx)
        })
        .await;

        assert_eq!(active, parent);
        let child = child.span().span_context().clone();
        assert_eq!(child.trace_id(), parent.trace_id());
        assert_ne!(child.span_id(), parent.span_id());
        assert!(command.end(SpanStatus::Ok, None).is_ok());
    }

    #[test]
    fn test_scope_accepts_owned_name() {
        let tracer = OtelTracer::new(String::from("docdb"));
        assert!(tracer.start_span("ping", &[]).is_ok());
    }
}
