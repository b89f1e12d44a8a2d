//! Backend-bound connectivity cache.

use super::{CHANNEL_KEY_PREFIX, CacheOperation, ChannelCache, channel_key};
use crate::backend::{BackendError, SetBackend};
use crate::context::CallContext;
use crate::observability::record_operation;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Instant;
use tracing::instrument;

/// Connectivity cache bound to a set backend.
///
/// Holds no state of its own: every call is one backend round trip under the
/// caller's [`CallContext`]. The backend handle is injected and its lifecycle
/// stays with whoever built it.
///
/// # Example
///
/// ```rust
/// use chancache::{CallContext, ChannelCache, ConnectivityCache, MemorySetBackend};
///
/// # tokio_test::block_on(async {
/// let cache = ConnectivityCache::new(MemorySetBackend::new());
/// let ctx = CallContext::new();
///
/// cache.connect(&ctx, "chan-1", "dev-A").await?;
/// assert!(cache.has_thing(&ctx, "chan-1", "dev-A").await?);
/// assert!(!cache.has_thing(&ctx, "chan-1", "dev-B").await?);
/// # Ok::<(), chancache::Error>(())
/// # }).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConnectivityCache<B> {
    backend: B,
    key_prefix: String,
}

impl<B: SetBackend> ConnectivityCache<B> {
    /// Creates a cache using the default `channel` key prefix.
    pub fn new(backend: B) -> Self {
        Self::with_key_prefix(backend, CHANNEL_KEY_PREFIX)
    }

    /// Creates a cache with a custom key prefix.
    ///
    /// Only needed when several deployments share one keyspace.
    pub fn with_key_prefix(backend: B, key_prefix: impl Into<String>) -> Self {
        Self {
            backend,
            key_prefix: key_prefix.into(),
        }
    }

    /// Returns the backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the key prefix.
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    fn key(&self, channel_id: &str) -> String {
        channel_key(&self.key_prefix, channel_id)
    }

    /// Maps the outcome of a mutation and records it.
    fn finish_write(
        &self,
        ctx: &CallContext,
        operation: CacheOperation,
        started: Instant,
        outcome: Result<std::result::Result<(), BackendError>>,
    ) -> Result<()> {
        let result = match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::CacheWrite {
                operation,
                cause: e.to_string(),
            }),
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => tracing::debug!(
                request_id = ctx.request_id(),
                backend = self.backend.name(),
                "Cache write applied"
            ),
            Err(e) => tracing::warn!(
                request_id = ctx.request_id(),
                backend = self.backend.name(),
                error = %e,
                "Cache write failed; cache may be stale until retried"
            ),
        }
        record_operation(operation, &result, started.elapsed());
        result
    }
}

#[async_trait]
impl<B: SetBackend> ChannelCache for ConnectivityCache<B> {
    #[instrument(skip(self, ctx), fields(operation = "connect", request_id = %ctx.request_id()))]
    async fn connect(&self, ctx: &CallContext, channel_id: &str, thing_id: &str) -> Result<()> {
        let started = Instant::now();
        let key = self.key(channel_id);
        let outcome = ctx
            .run(
                CacheOperation::Connect,
                self.backend.add_member(&key, thing_id),
            )
            .await;
        self.finish_write(ctx, CacheOperation::Connect, started, outcome)
    }

    #[instrument(skip(self, ctx), fields(operation = "has_thing", request_id = %ctx.request_id()))]
    async fn has_thing(
        &self,
        ctx: &CallContext,
        channel_id: &str,
        thing_id: &str,
    ) -> Result<bool> {
        let started = Instant::now();
        let key = self.key(channel_id);
        let outcome = ctx
            .run(
                CacheOperation::HasThing,
                self.backend.is_member(&key, thing_id),
            )
            .await;

        // A backend fault is indeterminate, never a "false"
        let result = match outcome {
            Ok(Ok(member)) => Ok(member),
            Ok(Err(e)) => Err(Error::ReadDegraded {
                cause: e.to_string(),
            }),
            Err(e) => Err(e),
        };

        match &result {
            Ok(member) => tracing::debug!(
                request_id = ctx.request_id(),
                backend = self.backend.name(),
                member = *member,
                "Cache lookup"
            ),
            Err(e) => tracing::warn!(
                request_id = ctx.request_id(),
                backend = self.backend.name(),
                error = %e,
                "Cache lookup indeterminate"
            ),
        }
        record_operation(CacheOperation::HasThing, &result, started.elapsed());
        result
    }

    #[instrument(skip(self, ctx), fields(operation = "disconnect", request_id = %ctx.request_id()))]
    async fn disconnect(
        &self,
        ctx: &CallContext,
        channel_id: &str,
        thing_id: &str,
    ) -> Result<()> {
        let started = Instant::now();
        let key = self.key(channel_id);
        let outcome = ctx
            .run(
                CacheOperation::Disconnect,
                self.backend.remove_member(&key, thing_id),
            )
            .await;
        self.finish_write(ctx, CacheOperation::Disconnect, started, outcome)
    }

    #[instrument(skip(self, ctx), fields(operation = "remove", request_id = %ctx.request_id()))]
    async fn remove(&self, ctx: &CallContext, channel_id: &str) -> Result<()> {
        let started = Instant::now();
        let key = self.key(channel_id);
        let outcome = ctx
            .run(CacheOperation::Remove, self.backend.delete_key(&key))
            .await;
        self.finish_write(ctx, CacheOperation::Remove, started, outcome)
    }
}
