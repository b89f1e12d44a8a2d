//! Redis Integration Tests
//!
//! Runs the connectivity cache against a live Redis server, focusing on:
//! - Set semantics of connect, disconnect and remove
//! - Key layout as seen by other Redis clients
//! - Error mapping for keys holding the wrong type
//!
//! These tests require a running Redis server. Set the environment variable
//! `CHANCACHE_TEST_REDIS_URL` to enable them:
//!
//! ```bash
//! export CHANCACHE_TEST_REDIS_URL="redis://localhost:6379"
//! cargo test --features redis redis_integration
//! ```

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::doc_markdown)]
#![cfg(feature = "redis")]

use chancache::{
    CacheOperation, CallContext, ChannelCache, ConnectivityCache, Error, RedisSetBackend,
};
use std::env;
use uuid::Uuid;

/// Environment variable for Redis test connection URL.
const REDIS_URL_ENV: &str = "CHANCACHE_TEST_REDIS_URL";

/// Returns the Redis connection URL if available, or None to skip tests.
fn get_redis_url() -> Option<String> {
    env::var(REDIS_URL_ENV).ok()
}

/// Macro to skip tests when Redis is not available.
macro_rules! require_redis {
    () => {
        match get_redis_url() {
            Some(url) => url,
            None => {
                eprintln!(
                    "Skipping test: {} not set. Set this environment variable to run Redis tests.",
                    REDIS_URL_ENV
                );
                return;
            },
        }
    };
}

/// Channel ID that cannot collide with other test runs.
fn unique_channel() -> String {
    format!("test-chan-{}", Uuid::new_v4().simple())
}

async fn cache(url: &str) -> ConnectivityCache<RedisSetBackend> {
    ConnectivityCache::new(RedisSetBackend::connect(url).await.unwrap())
}

async fn raw_connection(url: &str) -> redis::aio::MultiplexedConnection {
    redis::Client::open(url)
        .unwrap()
        .get_multiplexed_async_connection()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_connect_and_lookup() {
    let url = require_redis!();
    let cache = cache(&url).await;
    let ctx = CallContext::new();
    let channel = unique_channel();

    cache.connect(&ctx, &channel, "dev-A").await.unwrap();

    assert!(cache.has_thing(&ctx, &channel, "dev-A").await.unwrap());
    assert!(!cache.has_thing(&ctx, &channel, "dev-B").await.unwrap());

    cache.remove(&ctx, &channel).await.unwrap();
}

#[tokio::test]
async fn test_disconnect_and_remove() {
    let url = require_redis!();
    let cache = cache(&url).await;
    let ctx = CallContext::new();
    let channel = unique_channel();

    cache.connect(&ctx, &channel, "dev-A").await.unwrap();
    cache.connect(&ctx, &channel, "dev-B").await.unwrap();

    cache.disconnect(&ctx, &channel, "dev-A").await.unwrap();
    cache.disconnect(&ctx, &channel, "dev-A").await.unwrap();
    assert!(!cache.has_thing(&ctx, &channel, "dev-A").await.unwrap());
    assert!(cache.has_thing(&ctx, &channel, "dev-B").await.unwrap());

    cache.remove(&ctx, &channel).await.unwrap();
    cache.remove(&ctx, &channel).await.unwrap();
    assert!(!cache.has_thing(&ctx, &channel, "dev-B").await.unwrap());
}

#[tokio::test]
async fn test_key_layout_visible_to_other_clients() {
    let url = require_redis!();
    let cache = cache(&url).await;
    let ctx = CallContext::new();
    let channel = unique_channel();

    cache.connect(&ctx, &channel, "dev-A").await.unwrap();
    cache.connect(&ctx, &channel, "dev-A").await.unwrap();

    let mut conn = raw_connection(&url).await;
    let mut members: Vec<String> = redis::cmd("SMEMBERS")
        .arg(format!("channel:{channel}"))
        .query_async(&mut conn)
        .await
        .unwrap();
    members.sort();
    assert_eq!(members, vec!["dev-A".to_string()]);

    cache.remove(&ctx, &channel).await.unwrap();
    let exists: i64 = redis::cmd("EXISTS")
        .arg(format!("channel:{channel}"))
        .query_async(&mut conn)
        .await
        .unwrap();
    assert_eq!(exists, 0);
}

#[tokio::test]
async fn test_custom_prefix() {
    let url = require_redis!();
    let backend = RedisSetBackend::connect(&url).await.unwrap();
    let cache = ConnectivityCache::with_key_prefix(backend, "test-prefix");
    let ctx = CallContext::new();
    let channel = unique_channel();

    cache.connect(&ctx, &channel, "dev-A").await.unwrap();

    let mut conn = raw_connection(&url).await;
    let member: bool = redis::cmd("SISMEMBER")
        .arg(format!("test-prefix:{channel}"))
        .arg("dev-A")
        .query_async(&mut conn)
        .await
        .unwrap();
    assert!(member);

    cache.remove(&ctx, &channel).await.unwrap();
}

#[tokio::test]
async fn test_wrong_type_key_maps_to_cache_errors() {
    let url = require_redis!();
    let cache = cache(&url).await;
    let ctx = CallContext::new();
    let channel = unique_channel();

    let mut conn = raw_connection(&url).await;
    let () = redis::cmd("SET")
        .arg(format!("channel:{channel}"))
        .arg("not-a-set")
        .query_async(&mut conn)
        .await
        .unwrap();

    let err = cache.connect(&ctx, &channel, "dev-A").await.unwrap_err();
    assert!(matches!(
        err,
        Error::CacheWrite {
            operation: CacheOperation::Connect,
            ..
        }
    ));

    let err = cache.has_thing(&ctx, &channel, "dev-A").await.unwrap_err();
    assert!(err.is_read_degraded());

    // DEL works on any type
    cache.remove(&ctx, &channel).await.unwrap();
    assert!(!cache.has_thing(&ctx, &channel, "dev-A").await.unwrap());
}

#[tokio::test]
async fn test_concurrent_connects() {
    let url = require_redis!();
    let cache = std::sync::Arc::new(cache(&url).await);
    let channel = unique_channel();

    let mut handles = Vec::new();
    for i in 0..16 {
        let cache = std::sync::Arc::clone(&cache);
        let channel = channel.clone();
        handles.push(tokio::spawn(async move {
            cache
                .connect(&CallContext::new(), &channel, &format!("dev-{}", i % 4))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let ctx = CallContext::new();
    for i in 0..4 {
        assert!(
            cache
                .has_thing(&ctx, &channel, &format!("dev-{i}"))
                .await
                .unwrap()
        );
    }
    cache.remove(&ctx, &channel).await.unwrap();
}
