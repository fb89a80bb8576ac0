//! # Tessera Middleware
//!
//! Decorator composition for Tessera command handlers.
//!
//! A [`Middleware`] turns the next [`Handler`](tessera_core::Handler) into
//! a new one. A [`Pipeline`] applies an ordered list of middleware to a
//! terminal handler once at startup and is then shared, immutable, by every
//! concurrent request.
//!
//! ```text
//! request ─▶ Observability ─▶ Timeout ─▶ ... ─▶ command handler
//! ```
//!
//! ## Stages
//!
//! | Stage | Purpose |
//! |-------|---------|
//! | [`ObservabilityMiddleware`] | Entry/exit logs, one span, command counter and latency histogram |
//! | [`TimeoutMiddleware`] | Default deadline for requests that carry none |
//!
//! Any type implementing [`Middleware`], or a closure wrapped in
//! [`FnMiddleware`], can be layered alongside them.
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use tessera_core::{handler_fn, Handler, Message, RequestContext};
//! use tessera_middleware::{ObservabilityMiddleware, Pipeline, TimeoutMiddleware};
//! use tessera_telemetry::MemorySinks;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let memory = MemorySinks::new();
//! let pipeline = Pipeline::builder()
//!     .layer(ObservabilityMiddleware::with_sinks(memory.sinks()))
//!     .layer(TimeoutMiddleware::new(Duration::from_secs(30)))
//!     .build(handler_fn(|_ctx, msg: Message| async move { Ok(msg) }));
//!
//! let ctx = RequestContext::new();
//! pipeline.handle(&ctx, Message::empty("ping")).await.unwrap();
//! assert_eq!(memory.tracer.ended(), 1);
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod middleware;
pub mod pipeline;
pub mod stages;

pub use config::{ObservabilityConfig, ObservabilityConfigBuilder};
pub use middleware::{BoxedMiddleware, FnMiddleware, Middleware};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use stages::{ObservabilityMiddleware, TimeoutMiddleware};
