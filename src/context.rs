//! Per-call context: correlation ID, deadline and cancellation.
//!
//! Every cache operation takes a [`CallContext`] from its caller and runs the
//! backend request under it. A fired cancellation token yields
//! [`Error::Cancelled`]; a passed deadline yields [`Error::DeadlineExceeded`].
//! Neither is ever reported as a cache answer.

use crate::cache::CacheOperation;
use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Caller-supplied context for one cache call.
#[derive(Clone, Debug)]
pub struct CallContext {
    request_id: String,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallContext {
    /// Creates a context with a generated request ID, no deadline and a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses an existing request ID for log correlation.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Sets the deadline to `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Sets an absolute deadline.
    ///
    /// An earlier deadline already on the context wins.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Ties the context to a caller-owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` means unbounded.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns the cancellation token.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancels this context.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns whether the context was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs `fut` until it completes, the context is cancelled, or the deadline passes.
    ///
    /// An already-cancelled or already-expired context never polls `fut`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] or [`Error::DeadlineExceeded`] for the
    /// corresponding context event.
    pub async fn run<F, T>(&self, operation: CacheOperation, fut: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        if self.is_cancelled() {
            return Err(Error::Cancelled { operation });
        }
        if self.remaining().is_some_and(|left| left.is_zero()) {
            return Err(Error::DeadlineExceeded { operation });
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled { operation }),
            () = deadline => Err(Error::DeadlineExceeded { operation }),
            out = fut => Ok(out),
        }
    }
}
