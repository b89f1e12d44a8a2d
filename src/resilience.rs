//! Circuit breaking for channel caches.
//!
//! [`ResilientChannelCache`] wraps any [`ChannelCache`] so a failing backend
//! is not hammered by every authorization check. While the circuit is open,
//! calls fail fast with the error kind the backend itself would produce:
//! writes with [`Error::CacheWrite`], lookups with [`Error::ReadDegraded`].
//! An open circuit never answers `false`, and the wrapper never retries.
//!
//! # Transitions
//!
//! | From | Event | To |
//! |------|-------|----|
//! | Closed | `failure_threshold` consecutive unhealthy outcomes | Open |
//! | Open | next call after `reset_timeout` | Half-open (call becomes a trial) |
//! | Half-open | trial succeeds | Closed |
//! | Half-open | trial fails | Open |
//!
//! # Outcome Accounting
//!
//! | Outcome | Verdict |
//! |---------|---------|
//! | `Ok` | healthy |
//! | `CacheWrite`, `ReadDegraded`, `DeadlineExceeded` | unhealthy |
//! | `Cancelled`, or the call future dropped before completion | abandoned |
//!
//! Every admitted call holds a permit stamped with the breaker epoch, which
//! advances on each transition. Outcomes from an earlier epoch are ignored,
//! so a slow call admitted while closed cannot close a circuit that tripped
//! in the meantime. An abandoned half-open trial hands its slot back.

use crate::cache::{CacheOperation, ChannelCache};
use crate::context::CallContext;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Circuit breaker settings for [`ResilientChannelCache`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheResilienceConfig {
    /// Wrap the cache in a breaker at all (binary only; the library wrapper
    /// is always active once constructed).
    pub enabled: bool,
    /// Consecutive unhealthy outcomes that open the circuit.
    pub breaker_failure_threshold: u32,
    /// Time the circuit stays open before admitting a trial call.
    pub breaker_reset_timeout_ms: u64,
    /// Concurrent trial calls admitted while half-open.
    pub breaker_half_open_max_calls: u32,
}

impl Default for CacheResilienceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            breaker_failure_threshold: 5,
            breaker_reset_timeout_ms: 30_000,
            breaker_half_open_max_calls: 1,
        }
    }
}

impl CacheResilienceConfig {
    /// Defaults plus `CHANCACHE_BREAKER_*` environment overrides.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies `CHANCACHE_BREAKER_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from a key lookup. Unparseable values are ignored.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("CHANCACHE_BREAKER_ENABLED") {
            self.enabled = matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(parsed) =
            lookup("CHANCACHE_BREAKER_FAILURE_THRESHOLD").and_then(|v| v.parse::<u32>().ok())
        {
            self.breaker_failure_threshold = parsed.max(1);
        }
        if let Some(parsed) =
            lookup("CHANCACHE_BREAKER_RESET_MS").and_then(|v| v.parse::<u64>().ok())
        {
            self.breaker_reset_timeout_ms = parsed;
        }
        if let Some(parsed) =
            lookup("CHANCACHE_BREAKER_HALF_OPEN_MAX_CALLS").and_then(|v| v.parse::<u32>().ok())
        {
            self.breaker_half_open_max_calls = parsed.max(1);
        }
        self
    }

    /// Sets the failure threshold.
    #[must_use]
    pub const fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.breaker_failure_threshold = threshold;
        self
    }

    /// Sets the reset timeout in milliseconds.
    #[must_use]
    pub const fn with_reset_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.breaker_reset_timeout_ms = timeout_ms;
        self
    }

    /// Sets the number of concurrent half-open trials.
    #[must_use]
    pub const fn with_half_open_max_calls(mut self, max_calls: u32) -> Self {
        self.breaker_half_open_max_calls = max_calls;
        self
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls reach the backend.
    Closed,
    /// Calls fail fast without touching the backend.
    Open,
    /// A bounded number of trial calls reach the backend.
    HalfOpen,
}

impl BreakerState {
    /// Value of the `chancache_breaker_state` gauge.
    #[must_use]
    pub const fn gauge_value(self) -> f64 {
        match self {
            Self::Closed => 0.0,
            Self::Open => 1.0,
            Self::HalfOpen => 2.0,
        }
    }
}

#[derive(Debug)]
enum Phase {
    Closed { failures: u32 },
    Open { since: Instant },
    HalfOpen { trials: u32 },
}

/// What a finished call says about backend health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Healthy,
    Unhealthy,
    Abandoned,
}

impl Verdict {
    fn of<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::Healthy,
            Err(Error::Cancelled { .. }) => Self::Abandoned,
            Err(_) => Self::Unhealthy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Tripped,
    Probing,
    Recovered,
    Reopened,
}

/// Admission stamp. `trial` marks a call holding a half-open slot.
#[derive(Debug, Clone, Copy)]
struct Ticket {
    epoch: u64,
    trial: bool,
}

/// Breaker state machine. Time is passed in so tests control it.
#[derive(Debug)]
struct Breaker {
    phase: Phase,
    epoch: u64,
    failure_threshold: u32,
    reset_timeout: Duration,
    half_open_max_calls: u32,
}

impl Breaker {
    fn new(config: &CacheResilienceConfig) -> Self {
        Self {
            phase: Phase::Closed { failures: 0 },
            epoch: 0,
            failure_threshold: config.breaker_failure_threshold.max(1),
            reset_timeout: Duration::from_millis(config.breaker_reset_timeout_ms),
            half_open_max_calls: config.breaker_half_open_max_calls.max(1),
        }
    }

    const fn state(&self) -> BreakerState {
        match self.phase {
            Phase::Closed { .. } => BreakerState::Closed,
            Phase::Open { .. } => BreakerState::Open,
            Phase::HalfOpen { .. } => BreakerState::HalfOpen,
        }
    }

    fn enter(&mut self, phase: Phase, transition: Transition) -> Transition {
        self.phase = phase;
        self.epoch += 1;
        transition
    }

    /// Admits a call, or returns `None` to reject it.
    fn admit(&mut self, now: Instant) -> Option<(Ticket, Option<Transition>)> {
        let max_trials = self.half_open_max_calls;
        match &mut self.phase {
            Phase::Closed { .. } => Some((
                Ticket {
                    epoch: self.epoch,
                    trial: false,
                },
                None,
            )),
            Phase::Open { since } => {
                if now.duration_since(*since) < self.reset_timeout {
                    return None;
                }
                let transition = self.enter(Phase::HalfOpen { trials: 1 }, Transition::Probing);
                Some((
                    Ticket {
                        epoch: self.epoch,
                        trial: true,
                    },
                    Some(transition),
                ))
            },
            Phase::HalfOpen { trials } => {
                if *trials >= max_trials {
                    return None;
                }
                *trials += 1;
                Some((
                    Ticket {
                        epoch: self.epoch,
                        trial: true,
                    },
                    None,
                ))
            },
        }
    }

    /// Applies the outcome of an admitted call.
    fn settle(&mut self, ticket: Ticket, verdict: Verdict, now: Instant) -> Option<Transition> {
        if ticket.epoch != self.epoch {
            return None;
        }
        match verdict {
            Verdict::Abandoned => {
                if let (true, Phase::HalfOpen { trials }) = (ticket.trial, &mut self.phase) {
                    *trials = trials.saturating_sub(1);
                }
                None
            },
            Verdict::Healthy => match &mut self.phase {
                Phase::Closed { failures } => {
                    *failures = 0;
                    None
                },
                Phase::HalfOpen { .. } => Some(
                    self.enter(Phase::Closed { failures: 0 }, Transition::Recovered),
                ),
                Phase::Open { .. } => None,
            },
            Verdict::Unhealthy => match &mut self.phase {
                Phase::Closed { failures } => {
                    *failures += 1;
                    if *failures < self.failure_threshold {
                        return None;
                    }
                    Some(self.enter(Phase::Open { since: now }, Transition::Tripped))
                },
                Phase::HalfOpen { .. } => {
                    Some(self.enter(Phase::Open { since: now }, Transition::Reopened))
                },
                Phase::Open { .. } => None,
            },
        }
    }
}

fn lock(breaker: &Mutex<Breaker>) -> MutexGuard<'_, Breaker> {
    breaker.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Right to run one backend call. Dropping it unsettled counts as abandoned.
struct Permit<'a> {
    breaker: &'a Mutex<Breaker>,
    ticket: Ticket,
    settled: bool,
}

impl Permit<'_> {
    fn settle(mut self, verdict: Verdict) -> (Option<Transition>, BreakerState) {
        self.settled = true;
        let mut breaker = lock(self.breaker);
        let transition = breaker.settle(self.ticket, verdict, Instant::now());
        (transition, breaker.state())
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            lock(self.breaker).settle(self.ticket, Verdict::Abandoned, Instant::now());
        }
    }
}

/// Channel cache that fails fast while its backend is unhealthy.
pub struct ResilientChannelCache<C> {
    inner: C,
    breaker: Mutex<Breaker>,
    backend: &'static str,
}

impl<C: ChannelCache> ResilientChannelCache<C> {
    /// Wraps `inner`. `backend` labels logs and metrics.
    #[must_use]
    pub fn new(inner: C, config: &CacheResilienceConfig, backend: &'static str) -> Self {
        Self {
            inner,
            breaker: Mutex::new(Breaker::new(config)),
            backend,
        }
    }

    /// Returns the wrapped cache.
    pub const fn inner(&self) -> &C {
        &self.inner
    }

    /// Returns the current breaker state.
    pub fn state(&self) -> BreakerState {
        lock(&self.breaker).state()
    }

    fn admit(&self, ctx: &CallContext, operation: CacheOperation) -> Result<Permit<'_>> {
        let admitted = lock(&self.breaker).admit(Instant::now());

        let Some((ticket, transition)) = admitted else {
            metrics::counter!(
                "chancache_breaker_rejections_total",
                "operation" => operation.as_str(),
                "backend" => self.backend
            )
            .increment(1);
            tracing::debug!(
                request_id = ctx.request_id(),
                operation = operation.as_str(),
                backend = self.backend,
                "Cache call rejected by open circuit"
            );
            let cause = format!("circuit open for backend '{}'", self.backend);
            return Err(if operation.is_write() {
                Error::CacheWrite { operation, cause }
            } else {
                Error::ReadDegraded { cause }
            });
        };

        if let Some(transition) = transition {
            self.report(ctx, operation, transition, BreakerState::HalfOpen);
        }
        Ok(Permit {
            breaker: &self.breaker,
            ticket,
            settled: false,
        })
    }

    fn report(
        &self,
        ctx: &CallContext,
        operation: CacheOperation,
        transition: Transition,
        state: BreakerState,
    ) {
        metrics::gauge!("chancache_breaker_state", "backend" => self.backend)
            .set(state.gauge_value());

        let request_id = ctx.request_id();
        let op = operation.as_str();
        match transition {
            Transition::Tripped | Transition::Reopened => {
                metrics::counter!(
                    "chancache_breaker_trips_total",
                    "backend" => self.backend,
                    "operation" => op
                )
                .increment(1);
                if transition == Transition::Tripped {
                    tracing::warn!(
                        request_id,
                        operation = op,
                        backend = self.backend,
                        "Cache circuit opened; lookups degrade and writes fail until reset"
                    );
                } else {
                    tracing::warn!(
                        request_id,
                        operation = op,
                        backend = self.backend,
                        "Trial cache call failed; circuit open again"
                    );
                }
            },
            Transition::Probing => tracing::info!(
                request_id,
                operation = op,
                backend = self.backend,
                "Admitting trial cache call"
            ),
            Transition::Recovered => tracing::info!(
                request_id,
                operation = op,
                backend = self.backend,
                "Trial cache call succeeded; circuit closed"
            ),
        }
    }

    async fn execute<T, F>(&self, ctx: &CallContext, operation: CacheOperation, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let permit = self.admit(ctx, operation)?;
        let result = call.await;
        let (transition, state) = permit.settle(Verdict::of(&result));
        if let Some(transition) = transition {
            self.report(ctx, operation, transition, state);
        }
        result
    }
}

#[async_trait]
impl<C: ChannelCache> ChannelCache for ResilientChannelCache<C> {
    async fn connect(&self, ctx: &CallContext, channel_id: &str, thing_id: &str) -> Result<()> {
        self.execute(
            ctx,
            CacheOperation::Connect,
            self.inner.connect(ctx, channel_id, thing_id),
        )
        .await
    }

    async fn has_thing(
        &self,
        ctx: &CallContext,
        channel_id: &str,
        thing_id: &str,
    ) -> Result<bool> {
        self.execute(
            ctx,
            CacheOperation::HasThing,
            self.inner.has_thing(ctx, channel_id, thing_id),
        )
        .await
    }

    async fn disconnect(
        &self,
        ctx: &CallContext,
        channel_id: &str,
        thing_id: &str,
    ) -> Result<()> {
        self.execute(
            ctx,
            CacheOperation::Disconnect,
            self.inner.disconnect(ctx, channel_id, thing_id),
        )
        .await
    }

    async fn remove(&self, ctx: &CallContext, channel_id: &str) -> Result<()> {
        self.execute(ctx, CacheOperation::Remove, self.inner.remove(ctx, channel_id))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::MemorySetBackend;
    use crate::cache::ConnectivityCache;
    use std::sync::Arc;

    fn breaker(threshold: u32, reset_ms: u64, trials: u32) -> Breaker {
        Breaker::new(
            &CacheResilienceConfig::default()
                .with_failure_threshold(threshold)
                .with_reset_timeout_ms(reset_ms)
                .with_half_open_max_calls(trials),
        )
    }

    fn admit(breaker: &mut Breaker, now: Instant) -> Ticket {
        breaker.admit(now).unwrap().0
    }

    // =========================================================================
    // State machine
    // =========================================================================

    #[test]
    fn test_trips_after_consecutive_failures() {
        let mut b = breaker(3, 1_000, 1);
        let now = Instant::now();

        for _ in 0..2 {
            let t = admit(&mut b, now);
            assert_eq!(b.settle(t, Verdict::Unhealthy, now), None);
        }
        assert_eq!(b.state(), BreakerState::Closed);

        let t = admit(&mut b, now);
        assert_eq!(
            b.settle(t, Verdict::Unhealthy, now),
            Some(Transition::Tripped)
        );
        assert!(b.admit(now + Duration::from_millis(999)).is_none());
    }

    #[test]
    fn test_healthy_outcome_resets_count() {
        let mut b = breaker(2, 1_000, 1);
        let now = Instant::now();

        let t = admit(&mut b, now);
        b.settle(t, Verdict::Unhealthy, now);
        let t = admit(&mut b, now);
        b.settle(t, Verdict::Healthy, now);
        let t = admit(&mut b, now);
        assert_eq!(b.settle(t, Verdict::Unhealthy, now), None);
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[test]
    fn test_reset_timeout_admits_bounded_trials() {
        let mut b = breaker(1, 100, 2);
        let now = Instant::now();
        let t = admit(&mut b, now);
        b.settle(t, Verdict::Unhealthy, now);

        let later = now + Duration::from_millis(100);
        let (first, transition) = b.admit(later).unwrap();
        assert!(first.trial);
        assert_eq!(transition, Some(Transition::Probing));
        assert!(b.admit(later).is_some());
        assert!(b.admit(later).is_none());
        assert_eq!(b.state(), BreakerState::HalfOpen);
    }

    #[test]
    fn test_trial_outcome_decides_state() {
        let mut b = breaker(1, 0, 1);
        let now = Instant::now();
        let t = admit(&mut b, now);
        b.settle(t, Verdict::Unhealthy, now);

        let trial = admit(&mut b, now);
        assert_eq!(
            b.settle(trial, Verdict::Unhealthy, now),
            Some(Transition::Reopened)
        );

        let trial = admit(&mut b, now);
        assert_eq!(
            b.settle(trial, Verdict::Healthy, now),
            Some(Transition::Recovered)
        );
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[test]
    fn test_stale_success_does_not_close_open_circuit() {
        let mut b = breaker(1, 60_000, 1);
        let now = Instant::now();

        let slow = admit(&mut b, now);
        let fast = admit(&mut b, now);
        b.settle(fast, Verdict::Unhealthy, now);
        assert_eq!(b.state(), BreakerState::Open);

        assert_eq!(b.settle(slow, Verdict::Healthy, now), None);
        assert_eq!(b.state(), BreakerState::Open);
    }

    #[test]
    fn test_stale_failure_does_not_reopen() {
        let mut b = breaker(1, 0, 1);
        let now = Instant::now();

        let slow = admit(&mut b, now);
        let fast = admit(&mut b, now);
        b.settle(fast, Verdict::Unhealthy, now);
        let trial = admit(&mut b, now);
        b.settle(trial, Verdict::Healthy, now);

        assert_eq!(b.settle(slow, Verdict::Unhealthy, now), None);
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[test]
    fn test_dropped_permit_returns_trial_slot() {
        let shared = Mutex::new(breaker(1, 0, 1));
        let now = Instant::now();
        {
            let mut b = lock(&shared);
            let t = admit(&mut b, now);
            b.settle(t, Verdict::Unhealthy, now);
        }

        let (ticket, _) = lock(&shared).admit(now).unwrap();
        let permit = Permit {
            breaker: &shared,
            ticket,
            settled: false,
        };
        assert!(lock(&shared).admit(now).is_none());

        drop(permit);
        assert!(lock(&shared).admit(now).is_some());
    }

    #[test]
    fn test_minimum_values_are_clamped() {
        let b = breaker(0, 0, 0);
        assert_eq!(b.failure_threshold, 1);
        assert_eq!(b.half_open_max_calls, 1);
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    #[test]
    fn test_config_default_values() {
        let config = CacheResilienceConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.breaker_failure_threshold, 5);
        assert_eq!(config.breaker_reset_timeout_ms, 30_000);
        assert_eq!(config.breaker_half_open_max_calls, 1);
    }

    #[test]
    fn test_config_overrides_from_lookup() {
        let config = CacheResilienceConfig::default().with_overrides(|key| match key {
            "CHANCACHE_BREAKER_ENABLED" => Some("true".to_string()),
            "CHANCACHE_BREAKER_FAILURE_THRESHOLD" => Some("0".to_string()),
            "CHANCACHE_BREAKER_RESET_MS" => Some("250".to_string()),
            "CHANCACHE_BREAKER_HALF_OPEN_MAX_CALLS" => Some("not-a-number".to_string()),
            _ => None,
        });

        assert!(config.enabled);
        assert_eq!(config.breaker_failure_threshold, 1);
        assert_eq!(config.breaker_reset_timeout_ms, 250);
        assert_eq!(config.breaker_half_open_max_calls, 1);
    }

    // =========================================================================
    // Wrapper
    // =========================================================================

    type Wrapped = ResilientChannelCache<ConnectivityCache<Arc<MemorySetBackend>>>;

    fn wrapped(threshold: u32, reset_ms: u64) -> (Arc<MemorySetBackend>, Wrapped) {
        let backend = Arc::new(MemorySetBackend::new());
        let config = CacheResilienceConfig::default()
            .with_failure_threshold(threshold)
            .with_reset_timeout_ms(reset_ms);
        let cache = ResilientChannelCache::new(
            ConnectivityCache::new(Arc::clone(&backend)),
            &config,
            "memory",
        );
        (backend, cache)
    }

    #[tokio::test]
    async fn test_open_circuit_never_answers_false() {
        let (backend, cache) = wrapped(2, 60_000);
        let ctx = CallContext::new();
        cache.connect(&ctx, "chan-1", "dev-A").await.unwrap();

        backend.set_available(false);
        assert!(cache.has_thing(&ctx, "chan-1", "dev-A").await.is_err());
        assert!(cache.has_thing(&ctx, "chan-1", "dev-A").await.is_err());
        assert_eq!(cache.state(), BreakerState::Open);

        // Backend is back, but the circuit is still open
        backend.set_available(true);
        let err = cache.has_thing(&ctx, "chan-1", "dev-A").await.unwrap_err();
        assert!(err.is_read_degraded());
    }

    #[tokio::test]
    async fn test_open_circuit_rejects_writes_as_cache_write() {
        let (backend, cache) = wrapped(1, 60_000);
        let ctx = CallContext::new();

        backend.set_available(false);
        assert!(cache.remove(&ctx, "chan-1").await.is_err());
        backend.set_available(true);

        let err = cache.disconnect(&ctx, "chan-1", "dev-A").await.unwrap_err();
        assert!(matches!(
            err,
            Error::CacheWrite {
                operation: CacheOperation::Disconnect,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_cancellation_does_not_trip() {
        let (_backend, cache) = wrapped(1, 60_000);
        let ctx = CallContext::new();
        ctx.cancel();

        for _ in 0..3 {
            let err = cache.has_thing(&ctx, "chan-1", "dev-A").await.unwrap_err();
            assert!(matches!(err, Error::Cancelled { .. }));
        }
        assert_eq!(cache.state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trial_call_lets_breaker_recover() {
        let (backend, cache) = wrapped(1, 0);
        let ctx = CallContext::new();

        backend.set_available(false);
        assert!(cache.has_thing(&ctx, "chan-1", "dev-A").await.is_err());
        assert_eq!(cache.state(), BreakerState::Open);
        backend.set_available(true);

        // The trial call is dropped by the caller mid-flight
        backend.set_latency(Duration::from_millis(200));
        let timed_out = tokio::time::timeout(
            Duration::from_millis(10),
            cache.has_thing(&ctx, "chan-1", "dev-A"),
        )
        .await;
        assert!(timed_out.is_err());
        assert_eq!(cache.state(), BreakerState::HalfOpen);

        backend.set_latency(Duration::ZERO);
        assert!(!cache.has_thing(&ctx, "chan-1", "dev-A").await.unwrap());
        assert_eq!(cache.state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_success_keeps_circuit_open() {
        let (backend, cache) = wrapped(1, 60_000);
        backend.set_latency(Duration::from_millis(100));

        let patient = CallContext::new();
        let hurried = CallContext::new().with_timeout(Duration::from_millis(10));
        let (slow, fast) = tokio::join!(
            cache.has_thing(&patient, "chan-1", "dev-A"),
            cache.has_thing(&hurried, "chan-1", "dev-A"),
        );

        assert!(matches!(fast, Err(Error::DeadlineExceeded { .. })));
        assert!(!slow.unwrap());
        assert_eq!(cache.state(), BreakerState::Open);

        backend.set_latency(Duration::ZERO);
        let err = cache
            .has_thing(&CallContext::new(), "chan-1", "dev-A")
            .await
            .unwrap_err();
        assert!(err.is_read_degraded());
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let (_backend, cache) = wrapped(1, 60_000);
        let ctx = CallContext::new();

        cache.connect(&ctx, "chan-1", "dev-A").await.unwrap();
        assert!(cache.has_thing(&ctx, "chan-1", "dev-A").await.unwrap());
        cache.remove(&ctx, "chan-1").await.unwrap();
        assert!(!cache.has_thing(&ctx, "chan-1", "dev-A").await.unwrap());
        assert_eq!(cache.state(), BreakerState::Closed);
    }
}
