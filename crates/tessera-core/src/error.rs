//! Error types for command handling.
//!
//! [`HandlerError`] is what every [`Handler`](crate::Handler) returns on
//! failure. Middleware that only observes must hand it back to the caller
//! untouched, so the type carries everything the protocol layer needs to
//! build an error reply.
//!
//! # Taxonomy
//!
//! | Variant | [`ErrorKind`] | [`Outcome`] |
//! |---|---|---|
//! | `Command` | `command` | `failure` |
//! | `Internal` | `internal` | `failure` |
//! | `Cancelled` | `cancelled` | `cancelled` |
//! | `DeadlineExceeded` | `deadline_exceeded` | `cancelled` |

use crate::message::Message;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type returned by handlers.
pub type HandlerResult<T = Message> = Result<T, HandlerError>;

/// Errors produced while handling a command.
///
/// # Example
///
/// ```
/// use tessera_core::{ErrorKind, HandlerError};
///
/// let err = HandlerError::command(26, "NamespaceNotFound", "ns not found");
/// assert_eq!(err.kind(), ErrorKind::Command);
/// assert!(!err.is_cancellation());
/// ```
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The command ran and failed.
    #[error("{name} ({code}): {message}")]
    Command {
        /// Numeric error code sent back on the wire.
        code: i32,
        /// Symbolic name of the code.
        name: String,
        /// Human-readable error message.
        message: String,
    },

    /// The request context was cancelled.
    #[error("request cancelled")]
    Cancelled,

    /// The request context deadline elapsed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// An unexpected failure inside the server.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl HandlerError {
    /// Creates a command error.
    #[must_use]
    pub fn command(code: i32, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            code,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error without a source.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error wrapping `source`.
    #[must_use]
    pub fn internal_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Command { .. } => ErrorKind::Command,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Returns true for cancellation and deadline errors.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        self.kind().is_cancellation()
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal {
            message: err.to_string(),
            source: Some(err.into()),
        }
    }
}

/// Classification of a [`HandlerError`], used as a telemetry attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The command itself failed.
    Command,
    /// The request was cancelled.
    Cancelled,
    /// The request deadline elapsed.
    DeadlineExceeded,
    /// Internal server failure.
    Internal,
}

impl ErrorKind {
    /// Returns the snake_case name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Internal => "internal",
        }
    }

    /// Returns true for the two cancellation kinds.
    #[must_use]
    pub const fn is_cancellation(self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an invocation ended, from an observer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The handler returned a message.
    Success,
    /// The handler returned a command or internal error.
    Failure,
    /// The handler stopped because the context was cancelled or expired.
    Cancelled,
}

impl Outcome {
    /// Classifies a handler result.
    #[must_use]
    pub fn of<T>(result: &HandlerResult<T>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(err) if err.is_cancellation() => Self::Cancelled,
            Err(_) => Self::Failure,
        }
    }

    /// Returns the label value for this outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
