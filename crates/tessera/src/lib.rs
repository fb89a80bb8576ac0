//! # Tessera
//!
//! **Observable command handling for document database wire servers**
//!
//! Tessera sits between a wire-protocol front end and the command
//! handlers behind it:
//!
//! - **Handlers**: one [`Message`](core::Message) in, one reply or one
//!   [`HandlerError`](core::HandlerError) out, with cancellation and
//!   deadlines carried by [`RequestContext`](core::RequestContext)
//! - **Middleware**: decorators layered once at startup into an immutable
//!   [`Pipeline`](middleware::Pipeline)
//! - **Observability**: a log pair, a span and two metrics for every
//!   command, written to injectable sinks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tessera::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let guard = init_telemetry(TelemetryConfig::builder().service_name("docdb").build())?;
//!
//!     let pipeline = Pipeline::builder()
//!         .layer(ObservabilityMiddleware::with_sinks(guard.sinks()))
//!         .layer(TimeoutMiddleware::new(std::time::Duration::from_secs(30)))
//!         .build(handler_fn(|_ctx, msg: Message| async move { Ok(msg) }));
//!
//!     // for each decoded request:
//!     // let reply = pipeline.handle(&RequestContext::new(), message).await;
//!     guard.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! wire decoder ─▶ Observability ─▶ [your stages] ─▶ command handler
//!                      │
//!                      ├─▶ Logger  (tracing / JSON)
//!                      ├─▶ Tracer  (OpenTelemetry / OTLP)
//!                      └─▶ Metrics (Prometheus)
//! ```

#![doc(html_root_url = "https://docs.rs/tessera/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use tessera_core as core;

// Re-export middleware types
pub use tessera_middleware as middleware;

// Re-export telemetry backends and sinks
pub use tessera_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use tessera::prelude::*;
///
/// let memory = MemorySinks::new();
/// let pipeline = Pipeline::builder()
///     .layer(ObservabilityMiddleware::with_sinks(memory.sinks()))
///     .build(handler_fn(|_ctx, msg: Message| async move { Ok(msg) }));
/// assert_eq!(pipeline.stage_count(), 1);
/// ```
pub mod prelude {
    pub use tessera_core::{
        handler_fn, BoxFuture, BoxedHandler, CommandType, ErrorKind, Handler, HandlerError,
        HandlerResult, Message, Outcome, RequestContext, RequestId,
    };

    pub use tessera_middleware::{
        FnMiddleware, Middleware, ObservabilityConfig, ObservabilityMiddleware, Pipeline,
        PipelineBuilder, TimeoutMiddleware,
    };

    pub use tessera_telemetry::{
        init_telemetry, MemorySinks, TelemetryConfig, TelemetryGuard, TelemetrySinks,
    };
}
