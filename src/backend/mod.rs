//! Set-store backends.
//!
//! The connectivity cache needs four primitives from its key/value store,
//! all addressed by string key:
//!
//! | Primitive | Redis Command | Semantics |
//! |-----------|---------------|-----------|
//! | `add_member` | `SADD` | Atomic, idempotent insert |
//! | `remove_member` | `SREM` | Atomic, idempotent removal |
//! | `is_member` | `SISMEMBER` | Missing key reads as `false` |
//! | `delete_key` | `DEL` | Missing key is a no-op |
//!
//! # Available Implementations
//!
//! | Backend | Use Case |
//! |---------|----------|
//! | `RedisSetBackend` | Production; shared across service replicas |
//! | `MemorySetBackend` | Tests; supports fault injection |
//!
//! Backends report failures as [`BackendError`]. The cache layer maps those
//! into its own error kinds, so backends never decide between "write failed"
//! and "read degraded".

mod memory;
mod redis;

pub use memory::MemorySetBackend;
pub use redis::RedisSetBackend;

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a set backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend could not be reached (refused, dropped, I/O).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend did not reply within its own client timeout.
    #[error("backend timed out: {0}")]
    Timeout(String),

    /// The backend replied with an error (e.g. `WRONGTYPE`).
    #[error("backend command failed: {0}")]
    Command(String),
}

/// Trait for set-store backends.
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing via `Arc<dyn SetBackend>`
/// - Each primitive must be atomic on the backend side; callers rely on it
///   for concurrent `add_member` / `remove_member` on the same key
/// - Do not retry internally; retry policy belongs to the caller
#[async_trait]
pub trait SetBackend: Send + Sync {
    /// Short backend name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Adds `member` to the set at `key`, creating the set if needed.
    async fn add_member(&self, key: &str, member: &str) -> Result<(), BackendError>;

    /// Removes `member` from the set at `key`.
    async fn remove_member(&self, key: &str, member: &str) -> Result<(), BackendError>;

    /// Returns whether `member` is in the set at `key`.
    async fn is_member(&self, key: &str, member: &str) -> Result<bool, BackendError>;

    /// Deletes the set at `key`.
    async fn delete_key(&self, key: &str) -> Result<(), BackendError>;
}

#[async_trait]
impl<B: SetBackend + ?Sized> SetBackend for std::sync::Arc<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn add_member(&self, key: &str, member: &str) -> Result<(), BackendError> {
        (**self).add_member(key, member).await
    }

    async fn remove_member(&self, key: &str, member: &str) -> Result<(), BackendError> {
        (**self).remove_member(key, member).await
    }

    async fn is_member(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        (**self).is_member(key, member).await
    }

    async fn delete_key(&self, key: &str) -> Result<(), BackendError> {
        (**self).delete_key(key).await
    }
}
