//! Channel connectivity cache.
//!
//! Mirrors the relation "thing T is connected to channel C" from the primary
//! store into a set backend so authorization checks stay at memory latency.
//!
//! # Key Layout
//!
//! Each channel is one set, keyed by a namespaced channel ID:
//!
//! ```text
//! channel:{channel_id} -> { thing_id, thing_id, ... }
//! ```
//!
//! There is no per-thing index. Every lookup is "is this thing in this
//! channel", never "which channels is this thing in".
//!
//! # Consistency
//!
//! The cache is a derived view of the primary store and is written through
//! after the primary store commits. It is eventually consistent:
//!
//! | Situation | Effect |
//! |-----------|--------|
//! | Mutation not yet mirrored | Stale answer until the call lands |
//! | `CacheWrite` error | Stale until a retry or reconciliation |
//! | `ReadDegraded` error | No answer; caller falls back to the primary store |

mod connectivity;

pub use connectivity::ConnectivityCache;

use crate::Result;
use crate::context::CallContext;
use async_trait::async_trait;
use std::fmt;

/// Default namespace prefix for channel keys.
pub const CHANNEL_KEY_PREFIX: &str = "channel";

/// Builds the backend key for a channel.
///
/// The channel ID is used verbatim, including the empty string.
#[must_use]
pub fn channel_key(prefix: &str, channel_id: &str) -> String {
    format!("{prefix}:{channel_id}")
}

/// Cache operation, used in errors, logs and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    /// Add a thing to a channel.
    Connect,
    /// Membership lookup.
    HasThing,
    /// Remove a thing from a channel.
    Disconnect,
    /// Drop a whole channel.
    Remove,
}

impl CacheOperation {
    /// Returns the operation name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::HasThing => "has_thing",
            Self::Disconnect => "disconnect",
            Self::Remove => "remove",
        }
    }

    /// Returns whether the operation mutates the cache.
    #[must_use]
    pub const fn is_write(self) -> bool {
        !matches!(self, Self::HasThing)
    }
}

impl fmt::Display for CacheOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel connectivity cache contract.
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing via `Arc<dyn ChannelCache>`
/// - All mutations are idempotent; repeating a call is always safe
/// - `has_thing` returns `Ok(false)` only for a definite non-member; backend
///   faults surface as [`crate::Error::ReadDegraded`]
/// - Honor the [`CallContext`] deadline and cancellation on every call
#[async_trait]
pub trait ChannelCache: Send + Sync {
    /// Records that `thing_id` is connected to `channel_id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CacheWrite`] if the backend rejects the write,
    /// or a context error if the call is cancelled or times out.
    async fn connect(&self, ctx: &CallContext, channel_id: &str, thing_id: &str) -> Result<()>;

    /// Returns whether `thing_id` is connected to `channel_id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ReadDegraded`] if the backend cannot answer,
    /// or a context error if the call is cancelled or times out.
    async fn has_thing(&self, ctx: &CallContext, channel_id: &str, thing_id: &str)
    -> Result<bool>;

    /// Removes the connection between `thing_id` and `channel_id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CacheWrite`] if the backend rejects the write,
    /// or a context error if the call is cancelled or times out.
    async fn disconnect(&self, ctx: &CallContext, channel_id: &str, thing_id: &str)
    -> Result<()>;

    /// Drops every connection of `channel_id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CacheWrite`] if the backend rejects the write,
    /// or a context error if the call is cancelled or times out.
    async fn remove(&self, ctx: &CallContext, channel_id: &str) -> Result<()>;
}

#[async_trait]
impl<C: ChannelCache + ?Sized> ChannelCache for std::sync::Arc<C> {
    async fn connect(&self, ctx: &CallContext, channel_id: &str, thing_id: &str) -> Result<()> {
        (**self).connect(ctx, channel_id, thing_id).await
    }

    async fn has_thing(
        &self,
        ctx: &CallContext,
        channel_id: &str,
        thing_id: &str,
    ) -> Result<bool> {
        (**self).has_thing(ctx, channel_id, thing_id).await
    }

    async fn disconnect(
        &self,
        ctx: &CallContext,
        channel_id: &str,
        thing_id: &str,
    ) -> Result<()> {
        (**self).disconnect(ctx, channel_id, thing_id).await
    }

    async fn remove(&self, ctx: &CallContext, channel_id: &str) -> Result<()> {
        (**self).remove(ctx, channel_id).await
    }
}
