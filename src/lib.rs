//! # Chancache
//!
//! Channel connectivity cache for thing-to-channel authorization lookups.
//!
//! Every publish or subscribe in the platform has to answer "is thing T
//! connected to channel C?". Chancache mirrors that relation into a
//! low-latency set store so the answer comes from memory instead of the
//! primary database.
//!
//! ## Features
//!
//! - One relation: channel -> set of connected things
//! - Idempotent write-through mutations (`connect`, `disconnect`, `remove`)
//! - Fail-safe reads: a backend fault is never reported as "not connected"
//! - Per-call deadlines and cancellation via [`CallContext`]
//! - Pluggable backends (Redis, in-memory)
//!
//! ## Example
//!
//! ```rust,ignore
//! use chancache::{CallContext, ChannelCache, ConnectivityCache, RedisSetBackend};
//!
//! let backend = RedisSetBackend::connect("redis://localhost:6379").await?;
//! let cache = ConnectivityCache::new(backend);
//! let ctx = CallContext::new().with_timeout(Duration::from_millis(50));
//!
//! cache.connect(&ctx, "chan-1", "dev-A").await?;
//! assert!(cache.has_thing(&ctx, "chan-1", "dev-A").await?);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod backend;
pub mod cache;
pub mod config;
pub mod context;
pub mod observability;
pub mod resilience;

// Re-exports for convenience
pub use backend::{BackendError, MemorySetBackend, RedisSetBackend, SetBackend};
pub use cache::{CacheOperation, ChannelCache, ConnectivityCache, channel_key};
pub use config::CacheConfig;
pub use context::CallContext;
pub use resilience::{BreakerState, CacheResilienceConfig, ResilientChannelCache};

/// Error type for chancache operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `CacheWrite` | `connect`, `disconnect` or `remove` could not be applied by the backend |
/// | `ReadDegraded` | `has_thing` could not reach the backend |
/// | `Cancelled` | The caller's cancellation token fired before the backend replied |
/// | `DeadlineExceeded` | The caller's deadline passed before the backend replied |
/// | `InvalidInput` | Malformed configuration values |
/// | `OperationFailed` | Config file I/O, logging initialization |
/// | `FeatureNotEnabled` | Redis backend requested without the `redis` feature |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A cache mutation failed.
    ///
    /// The primary store already holds the change, so this is not fatal to
    /// the caller's workflow, but the cache may now be stale until a retry or
    /// reconciliation.
    #[error("cache write '{operation}' failed: {cause}")]
    CacheWrite {
        /// The mutation that failed.
        operation: CacheOperation,
        /// The underlying cause.
        cause: String,
    },

    /// The backend was unreachable during a membership lookup.
    ///
    /// This is an indeterminate answer. Callers must not read it as a denial
    /// or a grant; fall back to the primary store instead.
    #[error("cache read degraded: {cause}")]
    ReadDegraded {
        /// The underlying cause.
        cause: String,
    },

    /// The call was cancelled by the caller.
    #[error("cache operation '{operation}' cancelled")]
    Cancelled {
        /// The operation that was cancelled.
        operation: CacheOperation,
    },

    /// The call's deadline passed before the backend replied.
    #[error("cache operation '{operation}' exceeded its deadline")]
    DeadlineExceeded {
        /// The operation that timed out.
        operation: CacheOperation,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A non-cache operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Feature not enabled (requires feature flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),
}

impl Error {
    /// Returns `true` for a failed mutation.
    #[must_use]
    pub const fn is_write_failure(&self) -> bool {
        matches!(self, Self::CacheWrite { .. })
    }

    /// Returns `true` when a lookup could not be answered by the backend.
    #[must_use]
    pub const fn is_read_degraded(&self) -> bool {
        matches!(self, Self::ReadDegraded { .. })
    }

    /// Returns `true` when the caller's context ended the call.
    #[must_use]
    pub const fn is_context_error(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::DeadlineExceeded { .. })
    }
}

/// Result type alias for chancache operations.
pub type Result<T> = std::result::Result<T, Error>;
