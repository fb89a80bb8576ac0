//! Command message envelope.
//!
//! The protocol layer owns the encoding of messages. Inside Tessera a
//! [`Message`] is opaque apart from its [`CommandType`] discriminator, which
//! middleware may read to label telemetry. Payloads are never inspected.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used when a command name is missing or unsafe to use as a label.
pub const UNKNOWN_COMMAND: &str = "unknown";

/// The command-type discriminator of a [`Message`].
///
/// # Example
///
/// ```
/// use tessera_core::CommandType;
///
/// let command = CommandType::new("ping");
/// assert_eq!(command.as_str(), "ping");
/// assert_eq!(command.label(64), "ping");
///
/// // Names that would blow up label cardinality collapse to "unknown"
/// assert_eq!(CommandType::new("drop users; --").label(64), "unknown");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandType(String);

impl CommandType {
    /// Creates a command type from its wire name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the raw command name as it appeared on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a bounded-cardinality label for this command.
    ///
    /// The raw name is returned when it is non-empty, at most `max_len`
    /// bytes, and made only of ASCII alphanumerics, `_`, `.` or `-`.
    /// Anything else yields [`UNKNOWN_COMMAND`].
    #[must_use]
    pub fn label(&self, max_len: usize) -> &str {
        let name = self.0.as_str();
        let safe = !name.is_empty()
            && name.len() <= max_len
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'));

        if safe {
            name
        } else {
            UNKNOWN_COMMAND
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommandType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for CommandType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// An opaque command envelope.
///
/// Cloning a message is cheap: the payload is a reference-counted
/// [`Bytes`] buffer, so clones share the same underlying allocation.
///
/// # Example
///
/// ```
/// use tessera_core::Message;
///
/// let msg = Message::new("ping", &b"\x01"[..]);
/// assert_eq!(msg.command().as_str(), "ping");
/// assert_eq!(msg.payload().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    command: CommandType,
    payload: Bytes,
}

impl Message {
    /// Creates a message from a command type and an encoded payload.
    #[must_use]
    pub fn new(command: impl Into<CommandType>, payload: impl Into<Bytes>) -> Self {
        Self {
            command: command.into(),
            payload: payload.into(),
        }
    }

    /// Creates a message with an empty payload.
    #[must_use]
    pub fn empty(command: impl Into<CommandType>) -> Self {
        Self::new(command, Bytes::new())
    }

    /// Returns the command-type discriminator.
    #[must_use]
    pub fn command(&self) -> &CommandType {
        &self.command
    }

    /// Returns the encoded payload.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Splits the message into its discriminator and payload.
    #[must_use]
    pub fn into_parts(self) -> (CommandType, Bytes) {
        (self.command, self.payload)
    }
}
