//! Per-call cancellation and deadlines.
//!
//! Every [`GraphqlClient::post`](crate::clients::GraphqlClient::post) takes a
//! [`CallContext`]. The context is threaded through every attempt: an
//! in-flight send and any backoff sleep are raced against it, so cancelling
//! the token or passing the deadline stops the call without further attempts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::clients::errors::ClientError;

/// A cancellation token shared between a caller and in-flight calls.
///
/// Cloning the token shares the underlying state; cancelling any clone
/// cancels all of them.
///
/// # Example
///
/// ```rust
/// use gql_transport::clients::CancellationToken;
///
/// let token = CancellationToken::new();
/// let child = token.clone();
/// token.cancel();
/// assert!(child.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<CancellationState>,
}

#[derive(Debug)]
struct CancellationState {
    cancelled: AtomicBool,
    notify: tokio::sync::Notify,
}

impl CancellationToken {
    /// Create a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationState {
                cancelled: AtomicBool::new(false),
                notify: tokio::sync::Notify::new(),
            }),
        }
    }

    /// Check if cancellation has been requested.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation and wake every waiter.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::Release) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Wait until cancellation is requested.
    ///
    /// Returns immediately if already cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
            if self.is_cancelled() {
                return;
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation and deadline for a single call.
///
/// The default context never cancels and has no deadline.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use gql_transport::clients::{CallContext, CancellationToken};
///
/// let token = CancellationToken::new();
/// let ctx = CallContext::new()
///     .with_cancellation(token.clone())
///     .with_timeout(Duration::from_secs(5));
///
/// assert!(ctx.check().is_ok());
/// token.cancel();
/// assert!(ctx.check().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancellation: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Creates a context with no cancellation and no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline relative to now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns the cancellation token, if any.
    #[must_use]
    pub const fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails if the context is already cancelled or past its deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Cancelled`] or [`ClientError::DeadlineExceeded`].
    pub fn check(&self) -> Result<(), ClientError> {
        if self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(ClientError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(ClientError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves with the interruption error once the context is cancelled or
    /// its deadline passes. Never resolves for the default context.
    pub async fn interrupted(&self) -> ClientError {
        let cancelled = async {
            match &self.cancellation {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => ClientError::Cancelled,
            () = expired => ClientError::DeadlineExceeded,
        }
    }

    /// Sleeps for `delay` unless the context is interrupted first.
    ///
    /// # Errors
    ///
    /// Returns the interruption error if the context fires during the sleep.
    pub async fn sleep(&self, delay: Duration) -> Result<(), ClientError> {
        if delay.is_zero() {
            return self.check();
        }
        tokio::select! {
            biased;
            error = self.interrupted() => Err(error),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
