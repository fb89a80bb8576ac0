//! Built-in middleware stages.
//!
//! - [`observability`] - logs, spans and metrics around every command
//! - [`timeout`] - default deadline for requests that carry none

pub mod observability;
pub mod timeout;

pub use observability::ObservabilityMiddleware;
pub use timeout::TimeoutMiddleware;
