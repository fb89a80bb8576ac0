//! Core middleware trait.
//!
//! A [`Middleware`] is a decorator factory: given the next handler in the
//! chain it returns a new handler wrapping it. Layering happens once, when
//! the [`Pipeline`](crate::Pipeline) is built, so per-request dispatch is a
//! plain chain of `Handler::handle` calls with no lookups.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tessera_core::{BoxFuture, BoxedHandler, Handler, HandlerResult, Message, RequestContext};
//! use tessera_middleware::Middleware;
//!
//! struct Uppercase;
//!
//! struct UppercaseHandler {
//!     inner: BoxedHandler,
//! }
//!
//! impl Handler for UppercaseHandler {
//!     fn handle<'a>(
//!         &'a self,
//!         ctx: &'a RequestContext,
//!         message: Message,
//!     ) -> BoxFuture<'a, HandlerResult> {
//!         let command = message.command().as_str().to_ascii_uppercase();
//!         let (_, payload) = message.into_parts();
//!         self.inner.handle(ctx, Message::new(command, payload))
//!     }
//! }
//!
//! impl Middleware for Uppercase {
//!     fn name(&self) -> &'static str {
//!         "uppercase"
//!     }
//!
//!     fn layer(&self, next: BoxedHandler) -> BoxedHandler {
//!         Arc::new(UppercaseHandler { inner: next })
//!     }
//! }
//! ```

use std::sync::Arc;
use tessera_core::BoxedHandler;

/// A shared, type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Produces a handler that decorates the next one in the chain.
///
/// # Invariants
///
/// - `layer` is called once per pipeline build, never per request
/// - The returned handler MUST NOT keep per-request mutable state
/// - Unless transforming messages is its purpose, a middleware MUST return
///   the inner handler's result unchanged
pub trait Middleware: Send + Sync + 'static {
    /// Returns the stage name, used for diagnostics and pipeline checks.
    fn name(&self) -> &'static str;

    /// Wraps `next`.
    fn layer(&self, next: BoxedHandler) -> BoxedHandler;
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn layer(&self, next: BoxedHandler) -> BoxedHandler {
        (**self).layer(next)
    }
}

/// A middleware built from a closure over the next handler.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tessera_core::{handler_fn, BoxedHandler, HandlerError};
/// use tessera_middleware::FnMiddleware;
///
/// // Rejects everything without calling the inner handler.
/// let deny = FnMiddleware::new("deny", |_next: BoxedHandler| -> BoxedHandler {
///     Arc::new(handler_fn(|_ctx, _msg| async {
///         Err(HandlerError::command(13, "Unauthorized", "denied"))
///     }))
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> std::fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn layer(&self, next: BoxedHandler) -> BoxedHandler {
        (self.func)(next)
    }
}
