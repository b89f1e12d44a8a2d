//! In-memory set backend.
//!
//! Keeps channel sets in a process-local map. Intended for tests and for
//! single-process deployments that do not share the cache.
//!
//! Fault injection lets tests model an unreachable or slow backend:
//! - [`MemorySetBackend::set_available`] makes every primitive fail with
//!   [`BackendError::Unavailable`]
//! - [`MemorySetBackend::set_latency`] delays every primitive

use super::{BackendError, SetBackend};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// In-memory set backend.
#[derive(Debug)]
pub struct MemorySetBackend {
    sets: RwLock<HashMap<String, HashSet<String>>>,
    available: AtomicBool,
    latency_ms: AtomicU64,
}

impl Default for MemorySetBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySetBackend {
    /// Creates an empty, available backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sets: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// Marks the backend reachable or unreachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delays every primitive by `latency`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of non-empty sets currently held.
    pub fn key_count(&self) -> usize {
        self.sets.read().map(|sets| sets.len()).unwrap_or(0)
    }

    /// Returns whether a set exists at `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.sets
            .read()
            .map(|sets| sets.contains_key(key))
            .unwrap_or(false)
    }

    /// Applies injected latency and availability before a primitive runs.
    async fn gate(&self) -> Result<(), BackendError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::Unavailable(
                "memory backend marked unavailable".to_string(),
            ))
        }
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> BackendError {
    BackendError::Unavailable(format!("lock poisoned: {e}"))
}

#[async_trait]
impl SetBackend for MemorySetBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn add_member(&self, key: &str, member: &str) -> Result<(), BackendError> {
        self.gate().await?;
        let mut sets = self.sets.write().map_err(poisoned)?;
        sets.entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn remove_member(&self, key: &str, member: &str) -> Result<(), BackendError> {
        self.gate().await?;
        let mut sets = self.sets.write().map_err(poisoned)?;
        if let Some(set) = sets.get_mut(key) {
            set.remove(member);
            // Redis drops a set once its last member is gone
            if set.is_empty() {
                sets.remove(key);
            }
        }
        Ok(())
    }

    async fn is_member(&self, key: &str, member: &str) -> Result<bool, BackendError> {
        self.gate().await?;
        let sets = self.sets.read().map_err(poisoned)?;
        Ok(sets.get(key).is_some_and(|set| set.contains(member)))
    }

    async fn delete_key(&self, key: &str) -> Result<(), BackendError> {
        self.gate().await?;
        self.sets.write().map_err(poisoned)?.remove(key);
        Ok(())
    }
}
