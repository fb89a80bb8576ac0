//! Default request deadline.
//!
//! Requests that arrive without a deadline get one, so a stuck handler
//! cannot hold a connection forever. The inner handler runs under
//! [`RequestContext::run`], which turns an elapsed deadline into
//! [`HandlerError::DeadlineExceeded`](tessera_core::HandlerError::DeadlineExceeded)
//! even when the handler itself ignores the context.

use crate::middleware::Middleware;
use std::sync::Arc;
use std::time::Duration;
use tessera_core::{BoxFuture, BoxedHandler, Handler, HandlerResult, Message, RequestContext};

/// Stage name reported by [`TimeoutMiddleware`].
pub const STAGE_NAME: &str = "timeout";

/// Middleware that bounds every request by a deadline.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutMiddleware {
    timeout: Duration,
}

impl TimeoutMiddleware {
    /// Creates a middleware applying `timeout` to requests without a deadline.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns the default timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Middleware for TimeoutMiddleware {
    fn name(&self) -> &'static str {
        STAGE_NAME
    }

    fn layer(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(Bounded {
            inner: next,
            timeout: self.timeout,
        })
    }
}

struct Bounded {
    inner: BoxedHandler,
    timeout: Duration,
}

impl Handler for Bounded {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        message: Message,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let bounded;
            let ctx = if ctx.deadline().is_some() {
                ctx
            } else {
                bounded = ctx.child().with_timeout(self.timeout);
                &bounded
            };
            ctx.run(self.inner.handle(ctx, message)).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{handler_fn, HandlerError};

    /// A handler sleeping `delay`, behind a `timeout` stage.
    fn bounded_sleeper(timeout: Duration, delay: Duration) -> BoxedHandler {
        TimeoutMiddleware::new(timeout).layer(Arc::new(handler_fn(
            move |_ctx, msg: Message| async move {
                tokio::time::sleep(delay).await;
                Ok(msg)
            },
        )))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_handler_passes() {
        let handler = bounded_sleeper(Duration::from_millis(100), Duration::from_millis(5));
        let ctx = RequestContext::new();
        let reply = handler.handle(&ctx, Message::new("ping", "p")).await.unwrap();
        assert_eq!(reply.payload().as_ref(), b"p");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_handler_hits_default_deadline() {
        let handler = bounded_sleeper(Duration::from_millis(10), Duration::from_secs(60));
        let ctx = RequestContext::new();
        let err = handler.handle(&ctx, Message::empty("find")).await.unwrap_err();
        assert!(matches!(err, HandlerError::DeadlineExceeded));
        // the caller's context is left alone
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_deadline_wins() {
        let handler = bounded_sleeper(Duration::from_millis(10), Duration::from_millis(50));
        let ctx = RequestContext::new().with_timeout(Duration::from_secs(1));
        assert!(handler.handle(&ctx, Message::empty("find")).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_propagates() {
        let handler = bounded_sleeper(Duration::from_secs(10), Duration::from_secs(60));
        let ctx = RequestContext::new();
        ctx.cancel();
        let err = handler.handle(&ctx, Message::empty("find")).await.unwrap_err();
        assert!(matches!(err, HandlerError::Cancelled));
    }

    #[test]
    fn test_accessors() {
        let mw = TimeoutMiddleware::new(Duration::from_secs(3));
        assert_eq!(mw.name(), "timeout");
        assert_eq!(mw.timeout(), Duration::from_secs(3));
    }
}
