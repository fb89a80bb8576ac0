//! Request context types.
//!
//! The [`RequestContext`] travels with every command through the pipeline
//! and into the handler. It carries the request ID used for log correlation
//! together with the cancellation signal and optional deadline that
//! handlers must honor.

use crate::error::{HandlerError, HandlerResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
///
/// # Example
///
/// ```
/// use tessera_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Why a request context stopped waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    /// The context was cancelled explicitly (client went away, shutdown).
    Cancelled,
    /// The context deadline elapsed.
    DeadlineExceeded,
}

impl From<CancelReason> for HandlerError {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Cancelled => Self::Cancelled,
            CancelReason::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

/// Per-request context that flows through the pipeline.
///
/// Clones share the same cancellation token and deadline, so a clone handed
/// to a handler observes exactly the cancellation the caller signals.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tessera_core::RequestContext;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let ctx = RequestContext::new().with_timeout(Duration::from_secs(5));
/// assert!(ctx.deadline().is_some());
/// assert!(!ctx.is_cancelled());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this request.
    request_id: RequestId,

    /// Cancellation signal shared with the connection that owns the request.
    token: CancellationToken,

    /// Point in time after which the request must stop.
    deadline: Option<Instant>,

    /// When the request started processing.
    started_at: Instant,
}

impl RequestContext {
    /// Creates a new request context with a fresh request ID and no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a new request context with the specified request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            token: CancellationToken::new(),
            deadline: None,
            started_at: Instant::now(),
        }
    }

    /// Returns a context driven by an existing cancellation token.
    ///
    /// Connection handlers use this to tie every request on a connection to
    /// the connection's own lifetime.
    #[must_use]
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Returns a context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns a context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a child context.
    ///
    /// The child is cancelled whenever the parent is, but cancelling the
    /// child leaves the parent untouched. The deadline is inherited.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            request_id: self.request_id,
            token: self.token.child_token(),
            deadline: self.deadline,
            started_at: self.started_at,
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the time left before the deadline, if one is set.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns the underlying cancellation token.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Signals cancellation to every holder of this context.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true if the context was cancelled or its deadline has passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Waits until the context is cancelled or the deadline elapses.
    ///
    /// Explicit cancellation wins when both have happened.
    pub async fn cancelled(&self) -> CancelReason {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => CancelReason::Cancelled,
                    () = tokio::time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                CancelReason::Cancelled
            }
        }
    }

    /// Runs `fut` until it completes or the context stops.
    ///
    /// A context that is already cancelled returns immediately without
    /// polling `fut`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `fut`, or [`HandlerError::Cancelled`] /
    /// [`HandlerError::DeadlineExceeded`] if the context stopped first.
    pub async fn run<F, T>(&self, fut: F) -> HandlerResult<T>
    where
        F: Future<Output = HandlerResult<T>>,
    {
        tokio::select! {
            biased;
            reason = self.cancelled() => Err(reason.into()),
            result = fut => result,
        }
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_new_generates_unique_ids() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2, "Each RequestId should be unique");
    }

    #[test]
    fn test_request_id_display() {
        let display = RequestId::new().to_string();
        assert_eq!(display.len(), 36, "UUID string should be 36 characters");
    }

    #[test]
    fn test_request_id_from_uuid() {
        let uuid = Uuid::now_v7();
        assert_eq!(*RequestId::from_uuid(uuid).as_uuid(), uuid);
    }

    #[test]
    fn test_clone_shares_cancellation() {
        let ctx = RequestContext::new();
        let forwarded = ctx.clone();
        ctx.cancel();
        assert!(forwarded.is_cancelled());
        assert_eq!(forwarded.request_id(), ctx.request_id());
    }

    #[test]
    fn test_child_does_not_cancel_parent() {
        let parent = RequestContext::new();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.cancelled().await, CancelReason::DeadlineExceeded);
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_cancel_wins_over_deadline() {
        let ctx = RequestContext::new().with_timeout(Duration::from_secs(1));
        ctx.cancel();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(ctx.cancelled().await, CancelReason::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_future_result() {
        let ctx = RequestContext::new().with_timeout(Duration::from_secs(1));
        let result = ctx.run(async { Ok::<_, HandlerError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_at_deadline() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(20));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, HandlerError>(())
            })
            .await;
        assert!(matches!(result, Err(HandlerError::DeadlineExceeded)));
    }

    #[tokio::test]
    #[allow(unreachable_code)]
    async fn test_run_on_cancelled_context_skips_future() {
        let ctx = RequestContext::new();
        ctx.cancel();
        let result = ctx
            .run(async {
                panic!("future must not be polled");
                Ok::<(), HandlerError>(())
            })
            .await;
        assert!(matches!(result, Err(HandlerError::Cancelled)));
    }

    #[tokio::test]
    async fn test_token_from_connection() {
        let connection = CancellationToken::new();
        let ctx = RequestContext::new().with_token(connection.child_token());
        connection.cancel();
        assert_eq!(ctx.cancelled().await, CancelReason::Cancelled);
    }
}
