//! # Tessera Core
//!
//! Core types and traits shared by every Tessera crate.
//!
//! - [`Message`] - Opaque command envelope with a [`CommandType`] discriminator
//! - [`RequestContext`] - Per-request context carrying the request ID, cancellation and deadline
//! - [`RequestId`] - UUID v7 request identifier
//! - [`HandlerError`] - Errors a command handler can produce
//! - [`Outcome`] - Success / failure / cancellation classification of a result
//! - [`Handler`] - The unit of work every middleware wraps

#![doc(html_root_url = "https://docs.rs/tessera-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod handler;
mod message;

pub use context::{CancelReason, RequestContext, RequestId};
pub use error::{ErrorKind, HandlerError, HandlerResult, Outcome};
pub use handler::{handler_fn, BoxFuture, BoxedHandler, FnHandler, Handler};
pub use message::{CommandType, Message, UNKNOWN_COMMAND};
