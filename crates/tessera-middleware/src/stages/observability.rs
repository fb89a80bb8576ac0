//! Command observability middleware.
//!
//! Wraps a handler and, for every invocation, emits exactly one of each:
//!
//! | Signal | Success | Failure | Cancellation |
//! |--------|---------|---------|--------------|
//! | entry log | DEBUG | DEBUG | DEBUG |
//! | exit log | INFO | ERROR | WARN |
//! | span | ended `Ok` | ended `Error` | ended `Error` |
//! | `<ns>_commands_total` | `outcome="success"` | `outcome="failure"` | `outcome="cancelled"` |
//! | `<ns>_command_duration_seconds` | observed | observed | observed |
//!
//! The wrapped handler's result is returned untouched. Sink failures are
//! reported through `tracing` and never reach the caller. A handler that
//! panics is recorded as a failure before the panic continues to unwind.
//!
//! The inner handler runs with the command span active, so spans it starts
//! are its children and its `tracing` events sit inside a `command` span.
//!
//! # Pipeline Position
//!
//! Place this stage first so that rejections from later stages
//! (authorization, rate limiting, timeouts) are recorded:
//!
//! ```text
//! [Observability] → Auth → RateLimit → Handler
//! ```

use crate::config::ObservabilityConfig;
use crate::middleware::Middleware;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tessera_core::{
    BoxFuture, BoxedHandler, Handler, HandlerError, HandlerResult, Message, Outcome,
    RequestContext,
};
use tessera_telemetry::{
    fields, in_span, Attribute, NoopSpan, Span, SpanStatus, TelemetryResult, TelemetrySinks,
};
use tokio::time::Instant;
use tracing::{Instrument, Level};

/// Stage name reported by [`ObservabilityMiddleware`].
pub const STAGE_NAME: &str = "observability";

/// Middleware that logs, traces and meters every command.
#[derive(Debug, Clone)]
pub struct ObservabilityMiddleware {
    sinks: TelemetrySinks,
    config: ObservabilityConfig,
}

impl ObservabilityMiddleware {
    /// Creates the middleware over the given sinks.
    #[must_use]
    pub fn new(sinks: TelemetrySinks, config: ObservabilityConfig) -> Self {
        Self { sinks, config }
    }

    /// Creates the middleware with the default configuration, under the
    /// metric namespace the sinks carry.
    #[must_use]
    pub fn with_sinks(sinks: TelemetrySinks) -> Self {
        let config = ObservabilityConfig::builder()
            .namespace(sinks.namespace.clone())
            .build();
        Self::new(sinks, config)
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ObservabilityConfig {
        &self.config
    }
}

impl Middleware for ObservabilityMiddleware {
    fn name(&self) -> &'static str {
        STAGE_NAME
    }

    fn layer(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(Observed {
            inner: next,
            sinks: self.sinks.clone(),
            max_label_len: self.config.max_label_len,
            counter: self.config.counter_name(),
            histogram: self.config.histogram_name(),
        })
    }
}

/// The decorator produced by [`ObservabilityMiddleware::layer`].
struct Observed {
    inner: BoxedHandler,
    sinks: TelemetrySinks,
    max_label_len: usize,
    counter: String,
    histogram: String,
}

impl Handler for Observed {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        message: Message,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let invocation = Invocation::enter(self, ctx, &message);
            let scope = tracing::info_span!(
                "command",
                command = %invocation.command,
                request_id = %invocation.request_id,
            );
            let result = in_span(invocation.span(), self.inner.handle(ctx, message))
                .instrument(scope)
                .await;
            invocation.exit(Outcome::of(&result), result.as_ref().err());
            result
        })
    }
}

/// Telemetry state for one in-flight command.
///
/// If the enclosing future is dropped before the inner handler returns,
/// `Drop` records the invocation so that every started span is ended and
/// every entry log has a matching exit: as a failure while a panic unwinds,
/// as cancelled otherwise.
struct Invocation<'a> {
    observed: &'a Observed,
    command: String,
    request_id: String,
    started: Instant,
    span: Option<Box<dyn Span>>,
}

impl<'a> Invocation<'a> {
    fn enter(observed: &'a Observed, ctx: &RequestContext, message: &Message) -> Self {
        let command = message.command().label(observed.max_label_len).to_string();
        let request_id = ctx.request_id().to_string();
        let entered_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let span = match observed.sinks.tracer.start_span(
            &command,
            &[
                Attribute::new(fields::COMMAND, command.clone()),
                Attribute::new(fields::REQUEST_ID, request_id.clone()),
                Attribute::new(fields::ENTERED_AT, entered_at),
            ],
        ) {
            Ok(span) => span,
            Err(e) => {
                tracing::warn!(error = %e, command = %command, "Failed to start command span");
                Box::new(NoopSpan)
            }
        };

        report(
            observed.sinks.logger.log(
                Level::DEBUG,
                "command started",
                &[
                    Attribute::new(fields::COMMAND, command.clone()),
                    Attribute::new(fields::REQUEST_ID, request_id.clone()),
                ],
            ),
            &command,
        );

        Self {
            observed,
            command,
            request_id,
            started: Instant::now(),
            span: Some(span),
        }
    }

    fn span(&self) -> &dyn Span {
        self.span.as_deref().unwrap_or(&NoopSpan)
    }

    fn exit(mut self, outcome: Outcome, error: Option<&HandlerError>) {
        self.finish(outcome, error);
    }

    fn finish(&mut self, outcome: Outcome, error: Option<&HandlerError>) {
        let Some(mut span) = self.span.take() else {
            return;
        };
        let elapsed = self.started.elapsed();
        let duration_ms = elapsed.as_secs_f64() * 1000.0;
        let sinks = &self.observed.sinks;

        let (level, message) = match outcome {
            Outcome::Success => (Level::INFO, "command completed"),
            Outcome::Failure => (Level::ERROR, "command failed"),
            Outcome::Cancelled => (Level::WARN, "command cancelled"),
        };

        let mut attributes = vec![
            Attribute::new(fields::COMMAND, self.command.clone()),
            Attribute::new(fields::REQUEST_ID, self.request_id.clone()),
            Attribute::new(fields::DURATION_MS, duration_ms),
            Attribute::new(fields::OUTCOME, outcome.as_str()),
        ];
        if let Some(err) = error {
            attributes.push(Attribute::new(fields::ERROR_KIND, err.kind().as_str()));
            attributes.push(Attribute::new(fields::ERROR, err.to_string()));
        }
        report(sinks.logger.log(level, message, &attributes), &self.command);

        span.set_attribute(Attribute::new(fields::OUTCOME, outcome.as_str()));
        span.set_attribute(Attribute::new(fields::DURATION_MS, duration_ms));
        let status = if outcome == Outcome::Success {
            SpanStatus::Ok
        } else {
            SpanStatus::Error
        };
        let source = error.map(|e| e as &(dyn std::error::Error + 'static));
        report(span.end(status, source), &self.command);

        let labels = [
            (fields::COMMAND, self.command.clone()),
            (fields::OUTCOME, outcome.as_str().to_string()),
        ];
        report(
            sinks.metrics.increment_counter(&self.observed.counter, &labels),
            &self.command,
        );
        report(
            sinks
                .metrics
                .observe_histogram(&self.observed.histogram, elapsed.as_secs_f64(), &labels),
            &self.command,
        );
    }
}

impl Drop for Invocation<'_> {
    fn drop(&mut self) {
        if self.span.is_none() {
            return;
        }
        if std::thread::panicking() {
            self.finish(Outcome::Failure, Some(&HandlerError::internal("handler panicked")));
        } else {
            self.finish(Outcome::Cancelled, Some(&HandlerError::Cancelled));
        }
    }
}

fn report(result: TelemetryResult<()>, command: &str) {
    if let Err(e) = result {
        tracing::warn!(error = %e, command = %command, "Telemetry sink failed");
    }
}
