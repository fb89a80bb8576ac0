//! Pipeline assembly.
//!
//! A [`PipelineBuilder`] collects middleware in declared order and
//! [`PipelineBuilder::build`] folds them around a terminal handler exactly
//! once. Stages listed first end up outermost: `[A, B, C]` around `H`
//! behaves as `A(B(C(H)))`.
//!
//! ```text
//! request ─▶ A ─▶ B ─▶ C ─▶ H
//! reply   ◀─ A ◀─ B ◀─ C ◀─┘
//! ```
//!
//! The built [`Pipeline`] is immutable and shared by every concurrent
//! request; cloning it only bumps reference counts.

use crate::middleware::{BoxedMiddleware, Middleware};
use crate::stages::observability::STAGE_NAME as OBSERVABILITY_STAGE;
use std::fmt;
use std::sync::Arc;
use tessera_core::{BoxFuture, BoxedHandler, Handler, HandlerResult, Message, RequestContext};

/// An assembled, immutable handler chain.
///
/// # Example
///
/// ```
/// use tessera_core::{handler_fn, Handler, Message, RequestContext};
/// use tessera_middleware::{ObservabilityConfig, ObservabilityMiddleware, Pipeline};
/// use tessera_telemetry::MemorySinks;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let memory = MemorySinks::new();
/// let pipeline = Pipeline::builder()
///     .layer(ObservabilityMiddleware::new(memory.sinks(), ObservabilityConfig::default()))
///     .build(handler_fn(|_ctx, msg: Message| async move { Ok(msg) }));
///
/// let ctx = RequestContext::new();
/// let reply = pipeline.handle(&ctx, Message::empty("ping")).await.unwrap();
/// assert_eq!(reply.command().as_str(), "ping");
/// assert_eq!(pipeline.stage_names(), ["observability"]);
/// # }
/// ```
#[derive(Clone)]
pub struct Pipeline {
    root: BoxedHandler,
    stages: Arc<[&'static str]>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Returns the stage names, outermost first.
    #[must_use]
    pub fn stage_names(&self) -> &[&'static str] {
        &self.stages
    }

    /// Returns the number of middleware stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl Handler for Pipeline {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        message: Message,
    ) -> BoxFuture<'a, HandlerResult> {
        self.root.handle(ctx, message)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage inside every stage added so far.
    #[must_use]
    pub fn layer<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared stage.
    #[must_use]
    pub fn layer_shared(mut self, middleware: BoxedMiddleware) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Wraps `terminal` in every stage and returns the finished pipeline.
    pub fn build<H: Handler>(self, terminal: H) -> Pipeline {
        let names: Vec<&'static str> = self.stages.iter().map(|m| m.name()).collect();
        check_observability_position(&names);

        let mut root: BoxedHandler = Arc::new(terminal);
        for middleware in self.stages.iter().rev() {
            root = middleware.layer(root);
        }

        tracing::debug!(stages = ?names, "Pipeline assembled");

        Pipeline {
            root,
            stages: names.into(),
        }
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&'static str> = self.stages.iter().map(|m| m.name()).collect();
        f.debug_struct("PipelineBuilder")
            .field("stages", &names)
            .finish()
    }
}

/// Returns the stages that wrap the first observability stage, if any.
fn stages_hidden_from_observability<'a>(names: &'a [&'static str]) -> &'a [&'static str] {
    match names.iter().position(|name| *name == OBSERVABILITY_STAGE) {
        Some(pos) => &names[..pos],
        None => &[],
    }
}

fn check_observability_position(names: &[&'static str]) {
    let hidden = stages_hidden_from_observability(names);
    if !hidden.is_empty() {
        tracing::warn!(
            hidden = ?hidden,
            "Observability is not the outermost stage; failures raised by these stages will not be recorded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnMiddleware;
    use std::sync::Mutex;
    use tessera_core::handler_fn;

    /// Middleware that appends its name to a shared trace on the way in.
    fn recording_stage(
        name: &'static str,
        trace: Arc<Mutex<Vec<&'static str>>>,
    ) -> impl Middleware {
        FnMiddleware::new(name, move |next: BoxedHandler| -> BoxedHandler {
            let trace = Arc::clone(&trace);
            Arc::new(handler_fn(move |ctx, msg| {
                let next = Arc::clone(&next);
                let trace = Arc::clone(&trace);
                async move {
                    trace.lock().unwrap().push(name);
                    next.handle(&ctx, msg).await
                }
            }))
        })
    }

    #[tokio::test]
    async fn test_declared_order_is_nesting_order() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let terminal_trace = Arc::clone(&trace);

        let pipeline = Pipeline::builder()
            .layer(recording_stage("a", Arc::clone(&trace)))
            .layer(recording_stage("b", Arc::clone(&trace)))
            .layer(recording_stage("c", Arc::clone(&trace)))
            .build(handler_fn(move |_ctx, msg: Message| {
                let trace = Arc::clone(&terminal_trace);
                async move {
                    trace.lock().unwrap().push("handler");
                    Ok(msg)
                }
            }));

        let ctx = RequestContext::new();
        pipeline.handle(&ctx, Message::empty("ping")).await.unwrap();

        assert_eq!(*trace.lock().unwrap(), ["a", "b", "c", "handler"]);
    }

    #[tokio::test]
    async fn test_layering_happens_once() {
        let builds = Arc::new(Mutex::new(0_u32));
        let counter = Arc::clone(&builds);
        let mw = FnMiddleware::new("counting", move |next: BoxedHandler| {
            *counter.lock().unwrap() += 1;
            next
        });

        let pipeline = Pipeline::builder()
            .layer(mw)
            .build(handler_fn(|_ctx, msg: Message| async move { Ok(msg) }));

        let ctx = RequestContext::new();
        for _ in 0..5 {
            pipeline.handle(&ctx, Message::empty("ping")).await.unwrap();
        }
        assert_eq!(*builds.lock().unwrap(), 1);
    }

    #[test]
    fn test_stage_introspection() {
        let pipeline = Pipeline::builder()
            .layer(FnMiddleware::new("first", |next: BoxedHandler| next))
            .layer_shared(Arc::new(FnMiddleware::new("second", |next: BoxedHandler| next)))
            .build(handler_fn(|_ctx, msg: Message| async move { Ok(msg) }));

        assert_eq!(pipeline.stage_names(), ["first", "second"]);
        assert_eq!(pipeline.stage_count(), 2);
        assert_eq!(pipeline.clone().stage_count(), 2);
        assert!(format!("{pipeline:?}").contains("first"));
    }

    #[test]
    fn test_empty_pipeline() {
        let pipeline =
            Pipeline::builder().build(handler_fn(|_ctx, msg: Message| async move { Ok(msg) }));
        assert_eq!(pipeline.stage_count(), 0);
    }

    #[test]
    fn test_hidden_stage_detection() {
        assert!(stages_hidden_from_observability(&["observability", "auth"]).is_empty());
        assert!(stages_hidden_from_observability(&["auth", "timeout"]).is_empty());
        assert_eq!(
            stages_hidden_from_observability(&["rate_limit", "auth", "observability"]),
            ["rate_limit", "auth"]
        );
    }
}
