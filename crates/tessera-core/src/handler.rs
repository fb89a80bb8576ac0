//! Handler trait for command processing.
//!
//! A [`Handler`] turns one command [`Message`] into one reply or one
//! [`HandlerError`]. Terminal command handlers and every middleware
//! decorator implement the same trait, which is what lets a pipeline nest
//! them freely.

use crate::context::RequestContext;
use crate::error::HandlerResult;
use crate::message::Message;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future that is `Send` and borrows for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A shared, type-erased handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// The unit of work: one command in, one reply or error out.
///
/// Handlers are shared by every concurrent request, so they must be
/// `Send + Sync` and hold no per-request mutable state.
///
/// # Invariants
///
/// - Handlers MUST honor cancellation of `ctx` and return promptly with
///   [`HandlerError::Cancelled`](crate::HandlerError::Cancelled) or
///   [`HandlerError::DeadlineExceeded`](crate::HandlerError::DeadlineExceeded)
/// - Handlers MUST NOT retain `ctx` past the returned future
///
/// # Example
///
/// ```
/// use tessera_core::{BoxFuture, Handler, HandlerResult, Message, RequestContext};
///
/// struct Ping;
///
/// impl Handler for Ping {
///     fn handle<'a>(
///         &'a self,
///         _ctx: &'a RequestContext,
///         message: Message,
///     ) -> BoxFuture<'a, HandlerResult> {
///         Box::pin(async move { Ok(Message::new(message.command().clone(), &b"ok"[..])) })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Handles one command.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The request context, including cancellation and deadline
    /// * `message` - The command envelope
    fn handle<'a>(&'a self, ctx: &'a RequestContext, message: Message)
        -> BoxFuture<'a, HandlerResult>;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        message: Message,
    ) -> BoxFuture<'a, HandlerResult> {
        (**self).handle(ctx, message)
    }
}

/// A handler created from an async closure.
///
/// The closure receives a clone of the request context; clones share the
/// cancellation token and deadline of the original.
///
/// # Example
///
/// ```
/// use tessera_core::{handler_fn, Message};
///
/// let echo = handler_fn(|_ctx, msg: Message| async move { Ok(msg) });
/// ```
pub struct FnHandler<F> {
    func: F,
}

impl<F> FnHandler<F> {
    /// Creates a new function-based handler.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(RequestContext, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        message: Message,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin((self.func)(ctx.clone(), message))
    }
}

/// Shorthand for [`FnHandler::new`] that pins down the closure signature.
pub fn handler_fn<F, Fut>(func: F) -> FnHandler<F>
where
    F: Fn(RequestContext, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    FnHandler::new(func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fn_handler_echo() {
        let handler = handler_fn(|_ctx, msg: Message| async move { Ok(msg) });
        let ctx = RequestContext::new();
        let msg = Message::new("ping", &b"\x01"[..]);

        let reply = handler.handle(&ctx, msg.clone()).await.unwrap();
        assert_eq!(reply, msg);
    }

    #[tokio::test]
    async fn test_boxed_handler_dispatch() {
        let handler: BoxedHandler = Arc::new(handler_fn(|_ctx, _msg| async {
            Err(HandlerError::command(59, "CommandNotFound", "no such command"))
        }));

        let err = handler
            .handle(&RequestContext::new(), Message::empty("frob"))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Command { code: 59, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fn_handler_sees_caller_cancellation() {
        let handler = handler_fn(|ctx: RequestContext, _msg| async move {
            ctx.run(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Message::empty("never"))
            })
            .await
        });

        let ctx = RequestContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let err = handler.handle(&ctx, Message::empty("find")).await.unwrap_err();
        assert!(matches!(err, HandlerError::Cancelled));
    }
}
