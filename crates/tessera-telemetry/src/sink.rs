//! Telemetry sink interfaces.
//!
//! The server owns the concrete logger, tracer and metrics backends and
//! injects them into middleware through these traits. All sinks are shared
//! across concurrent requests and must be `Send + Sync`.
//!
//! Every sink call returns a [`TelemetryResult`] so that callers can isolate
//! backend failures from the request they are observing.

use crate::metrics::DEFAULT_NAMESPACE;
use crate::TelemetryResult;
use opentelemetry::Context;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::Level;

/// A structured attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A string value.
    String(String),
    /// A signed integer value.
    Int(i64),
    /// A floating point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A key/value attribute attached to a log record or span.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Attribute key. Keys are fixed by the emitter, never user supplied.
    pub key: &'static str,
    /// Attribute value.
    pub value: AttributeValue,
}

impl Attribute {
    /// Creates a new attribute.
    pub fn new(key: &'static str, value: impl Into<AttributeValue>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Finds the value of `key` in an attribute list.
#[must_use]
pub fn find_attribute<'a>(attributes: &'a [Attribute], key: &str) -> Option<&'a AttributeValue> {
    attributes.iter().find(|a| a.key == key).map(|a| &a.value)
}

/// A metric label set. Keys are fixed per metric.
pub type Labels = [(&'static str, String)];

/// Structured logger.
pub trait Logger: Send + Sync + 'static {
    /// Records one log entry.
    fn log(&self, level: Level, message: &str, attributes: &[Attribute]) -> TelemetryResult<()>;
}

/// Final status of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanStatus {
    /// The operation succeeded.
    Ok,
    /// The operation failed.
    Error,
}

/// A started span. Dropping a span without calling [`Span::end`] leaves it
/// to the backend's own cleanup, so callers should always end it.
pub trait Span: Send {
    /// Adds an attribute to the span.
    fn set_attribute(&mut self, attribute: Attribute);

    /// Finalizes the span with a status and an optional error.
    fn end(
        self: Box<Self>,
        status: SpanStatus,
        error: Option<&(dyn std::error::Error + 'static)>,
    ) -> TelemetryResult<()>;

    /// OpenTelemetry context with this span active.
    ///
    /// Work run under it (see [`in_span`](crate::tracing::in_span)) starts
    /// its spans as children of this one. Spans with no OpenTelemetry
    /// backing return the current context.
    fn context(&self) -> Context {
        Context::current()
    }
}

/// Span factory.
pub trait Tracer: Send + Sync + 'static {
    /// Starts a span named `name` tagged with `attributes`.
    fn start_span(&self, name: &str, attributes: &[Attribute]) -> TelemetryResult<Box<dyn Span>>;
}

/// Metrics recorder.
pub trait MetricsRecorder: Send + Sync + 'static {
    /// Increments counter `name` by one.
    fn increment_counter(&self, name: &str, labels: &Labels) -> TelemetryResult<()>;

    /// Records one histogram observation.
    fn observe_histogram(&self, name: &str, value: f64, labels: &Labels) -> TelemetryResult<()>;
}

/// A span that records nothing.
///
/// Stands in when a tracer fails to start a span, so the rest of the
/// invocation can proceed unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSpan;

impl Span for NoopSpan {
    fn set_attribute(&mut self, _attribute: Attribute) {}

    fn end(
        self: Box<Self>,
        _status: SpanStatus,
        _error: Option<&(dyn std::error::Error + 'static)>,
    ) -> TelemetryResult<()> {
        Ok(())
    }
}

/// The logger, tracer and metrics recorder injected into middleware.
///
/// The bundle also carries the metric namespace the backends were set up
/// for, so middleware built from it emits names the exporter knows.
/// Cloning is cheap; all three sinks are shared.
#[derive(Clone)]
pub struct TelemetrySinks {
    /// Structured logger.
    pub logger: Arc<dyn Logger>,
    /// Span factory.
    pub tracer: Arc<dyn Tracer>,
    /// Metrics recorder.
    pub metrics: Arc<dyn MetricsRecorder>,
    /// Metric name prefix.
    pub namespace: String,
}

impl TelemetrySinks {
    /// Bundles three sinks under the default namespace.
    pub fn new(
        logger: Arc<dyn Logger>,
        tracer: Arc<dyn Tracer>,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self {
            logger,
            tracer,
            metrics,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// Sets the metric name prefix.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Production sinks: `tracing` events, the global OpenTelemetry tracer
    /// and the global `metrics` recorder. Spans are reported under the
    /// `service_name` instrumentation scope.
    ///
    /// The globals are installed by [`init_telemetry`](crate::init_telemetry);
    /// before that the sinks are valid but discard everything.
    #[must_use]
    pub fn production(service_name: impl Into<String>) -> Self {
        Self::new(
            Arc::new(crate::logging::TracingLogger::new()),
            Arc::new(crate::tracing::OtelTracer::new(service_name.into())),
            Arc::new(crate::metrics::MetricsCrateRecorder::new()),
        )
    }
}

impl fmt::Debug for TelemetrySinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetrySinks")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}
