//! In-memory telemetry sinks.
//!
//! These sinks record everything they receive so that tests (and embedders
//! that want to inspect telemetry directly) can assert on exact emission
//! counts. All of them are safe for concurrent use.
//!
//! # Example
//!
//! ```
//! use tessera_telemetry::memory::MemorySinks;
//!
//! let memory = MemorySinks::new();
//! let sinks = memory.sinks();
//! sinks
//!     .metrics
//!     .increment_counter("tessera_commands_total", &[("command", "ping".to_string())])
//!     .unwrap();
//! assert_eq!(memory.metrics.counter_total("tessera_commands_total", &[("command", "ping")]), 1);
//! ```

use crate::error::TelemetryError;
use crate::sink::{
    find_attribute, Attribute, AttributeValue, Labels, Logger, MetricsRecorder, Span, SpanStatus,
    TelemetrySinks, Tracer,
};
use crate::TelemetryResult;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::Level;

/// A recorded log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Severity.
    pub level: Level,
    /// Message text.
    pub message: String,
    /// Structured attributes.
    pub attributes: Vec<Attribute>,
}

impl LogRecord {
    /// Returns the value of attribute `key`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        find_attribute(&self.attributes, key)
    }
}

/// Logger that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLogger {
    /// Creates an empty logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all records.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Returns the records logged at `level`.
    #[must_use]
    pub fn records_at(&self, level: Level) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .cloned()
            .collect()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if nothing was logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, level: Level, message: &str, attributes: &[Attribute]) -> TelemetryResult<()> {
        self.records.lock().push(LogRecord {
            level,
            message: message.to_string(),
            attributes: attributes.to_vec(),
        });
        Ok(())
    }
}

/// A recorded span.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRecord {
    /// Span name.
    pub name: String,
    /// Attributes given at start plus any set afterwards.
    pub attributes: Vec<Attribute>,
    /// Final status; `None` while the span is open.
    pub status: Option<SpanStatus>,
    /// Rendered error attached at end.
    pub error: Option<String>,
}

impl SpanRecord {
    /// Returns true once the span has been ended.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.status.is_some()
    }

    /// Returns the value of attribute `key`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        find_attribute(&self.attributes, key)
    }
}

/// Tracer that keeps every span in memory.
#[derive(Debug, Default)]
pub struct MemoryTracer {
    spans: Arc<Mutex<Vec<SpanRecord>>>,
}

impl MemoryTracer {
    /// Creates an empty tracer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all spans, open or ended.
    #[must_use]
    pub fn spans(&self) -> Vec<SpanRecord> {
        self.spans.lock().clone()
    }

    /// Returns the number of spans started.
    #[must_use]
    pub fn started(&self) -> usize {
        self.spans.lock().len()
    }

    /// Returns the number of spans ended.
    #[must_use]
    pub fn ended(&self) -> usize {
        self.spans.lock().iter().filter(|s| s.is_ended()).count()
    }
}

impl Tracer for MemoryTracer {
    fn start_span(&self, name: &str, attributes: &[Attribute]) -> TelemetryResult<Box<dyn Span>> {
        let mut spans = self.spans.lock();
        let index = spans.len();
        spans.push(SpanRecord {
            name: name.to_string(),
            attributes: attributes.to_vec(),
            status: None,
            error: None,
        });

        Ok(Box::new(MemorySpan {
            index,
            spans: Arc::clone(&self.spans),
        }))
    }
}

struct MemorySpan {
    index: usize,
    spans: Arc<Mutex<Vec<SpanRecord>>>,
}

impl Span for MemorySpan {
    fn set_attribute(&mut self, attribute: Attribute) {
        if let Some(record) = self.spans.lock().get_mut(self.index) {
            record.attributes.push(attribute);
        }
    }

    fn end(
        self: Box<Self>,
        status: SpanStatus,
        error: Option<&(dyn std::error::Error + 'static)>,
    ) -> TelemetryResult<()> {
        let mut spans = self.spans.lock();
        let record = spans
            .get_mut(self.index)
            .ok_or_else(|| TelemetryError::sink("tracer", "span record vanished"))?;
        if record.is_ended() {
            return Err(TelemetryError::sink("tracer", "span ended twice"));
        }
        record.status = Some(status);
        record.error = error.map(ToString::to_string);
        Ok(())
    }
}

/// A recorded counter increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSample {
    /// Metric name.
    pub name: String,
    /// Label set.
    pub labels: Vec<(&'static str, String)>,
}

/// A recorded histogram observation.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSample {
    /// Metric name.
    pub name: String,
    /// Observed value.
    pub value: f64,
    /// Label set.
    pub labels: Vec<(&'static str, String)>,
}

fn labels_match(have: &[(&'static str, String)], want: &[(&str, &str)]) -> bool {
    want.iter()
        .all(|(k, v)| have.iter().any(|(hk, hv)| hk == k && hv == v))
}

/// Metrics recorder that keeps every sample in memory.
#[derive(Debug, Default)]
pub struct MemoryMetrics {
    counters: Mutex<Vec<CounterSample>>,
    histograms: Mutex<Vec<HistogramSample>>,
}

impl MemoryMetrics {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of increments of counter `name` whose labels include `labels`.
    #[must_use]
    pub fn counter_total(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.counters
            .lock()
            .iter()
            .filter(|s| s.name == name && labels_match(&s.labels, labels))
            .count() as u64
    }

    /// Observations of histogram `name` whose labels include `labels`.
    #[must_use]
    pub fn histogram_values(&self, name: &str, labels: &[(&str, &str)]) -> Vec<f64> {
        self.histograms
            .lock()
            .iter()
            .filter(|s| s.name == name && labels_match(&s.labels, labels))
            .map(|s| s.value)
            .collect()
    }

    /// All counter increments, in arrival order.
    #[must_use]
    pub fn counters(&self) -> Vec<CounterSample> {
        self.counters.lock().clone()
    }

    /// All histogram observations, in arrival order.
    #[must_use]
    pub fn histograms(&self) -> Vec<HistogramSample> {
        self.histograms.lock().clone()
    }
}

impl MetricsRecorder for MemoryMetrics {
    fn increment_counter(&self, name: &str, labels: &Labels) -> TelemetryResult<()> {
        self.counters.lock().push(CounterSample {
            name: name.to_string(),
            labels: labels.to_vec(),
        });
        Ok(())
    }

    fn observe_histogram(&self, name: &str, value: f64, labels: &Labels) -> TelemetryResult<()> {
        self.histograms.lock().push(HistogramSample {
            name: name.to_string(),
            value,
            labels: labels.to_vec(),
        });
        Ok(())
    }
}

/// Typed handles to a set of in-memory sinks.
#[derive(Debug, Clone, Default)]
pub struct MemorySinks {
    /// The logger.
    pub logger: Arc<MemoryLogger>,
    /// The tracer.
    pub tracer: Arc<MemoryTracer>,
    /// The metrics recorder.
    pub metrics: Arc<MemoryMetrics>,
}

impl MemorySinks {
    /// Creates fresh, empty sinks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sinks as an injectable bundle.
    #[must_use]
    pub fn sinks(&self) -> TelemetrySinks {
        TelemetrySinks::new(
            self.logger.clone(),
            self.tracer.clone(),
            self.metrics.clone(),
        )
    }
}

/// A sink that rejects every call.
///
/// Implements all three sink traits; useful to check that backend failures
/// never leak into request handling.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSink;

impl FailingSink {
    /// Returns a bundle where every sink fails.
    #[must_use]
    pub fn sinks() -> TelemetrySinks {
        TelemetrySinks::new(Arc::new(Self), Arc::new(Self), Arc::new(Self))
    }
}

impl Logger for FailingSink {
    fn log(&self, _level: Level, _message: &str, _attributes: &[Attribute]) -> TelemetryResult<()> {
        Err(TelemetryError::sink("logger", "log pipe closed"))
    }
}

impl Tracer for FailingSink {
    fn start_span(&self, _name: &str, _attributes: &[Attribute]) -> TelemetryResult<Box<dyn Span>> {
        Err(TelemetryError::sink("tracer", "exporter unavailable"))
    }
}

impl MetricsRecorder for FailingSink {
    fn increment_counter(&self, _name: &str, _labels: &Labels) -> TelemetryResult<()> {
        Err(TelemetryError::sink("metrics", "recorder poisoned"))
    }

    fn observe_histogram(&self, _name: &str, _value: f64, _labels: &Labels) -> TelemetryResult<()> {
        Err(TelemetryError::sink("metrics", "recorder poisoned"))
    }
}
