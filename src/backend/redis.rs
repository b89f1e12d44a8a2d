//! Redis set backend.
//!
//! Stores each channel as a Redis set and relies on Redis' own atomicity for
//! concurrent mutations of the same set.
//!
//! # Redis Commands Used
//!
//! | Operation | Redis Command | Reply |
//! |-----------|---------------|-------|
//! | Add member | `SADD key member` | Number of members added (0 or 1) |
//! | Remove member | `SREM key member` | Number of members removed (0 or 1) |
//! | Membership | `SISMEMBER key member` | 1 or 0 (0 for a missing key) |
//! | Delete set | `DEL key` | Number of keys removed |
//!
//! # Connection Handling
//!
//! The backend holds a [`redis::aio::ConnectionManager`], which multiplexes
//! requests over one connection and reconnects after failures. Clones share
//! the same connection, so the backend never owns the client lifecycle:
//! build the manager once per process and hand clones to each cache.

#[cfg(feature = "redis")]
mod implementation {
    use crate::backend::{BackendError, SetBackend};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use redis::aio::ConnectionManager;
    use redis::{Client, RedisError};
    use std::time::Duration;

    /// Redis-backed set store.
    #[derive(Clone)]
    pub struct RedisSetBackend {
        /// Shared, auto-reconnecting connection.
        manager: ConnectionManager,
    }

    impl RedisSetBackend {
        /// Wraps an existing connection manager.
        #[must_use]
        pub const fn from_manager(manager: ConnectionManager) -> Self {
            Self { manager }
        }

        /// Opens a client for `connection_url` and establishes a managed connection.
        ///
        /// # Errors
        ///
        /// Returns an error if the URL is invalid or the first connection fails.
        pub async fn connect(connection_url: &str) -> Result<Self> {
            let client = Client::open(connection_url).map_err(|e| Error::OperationFailed {
                operation: "redis_open".to_string(),
                cause: e.to_string(),
            })?;

            let manager = client
                .get_connection_manager()
                .await
                .map_err(|e| Error::OperationFailed {
                    operation: "redis_connect".to_string(),
                    cause: e.to_string(),
                })?;

            tracing::info!(url = %redact_url(connection_url), "Connected to Redis");

            Ok(Self::from_manager(manager))
        }

        /// Like [`RedisSetBackend::connect`], but gives up after `limit`.
        ///
        /// `None` waits as long as the client does.
        ///
        /// # Errors
        ///
        /// Returns an error if the URL is invalid, the first connection fails,
        /// or it does not complete within `limit`.
        pub async fn connect_within(connection_url: &str, limit: Option<Duration>) -> Result<Self> {
            let Some(limit) = limit else {
                return Self::connect(connection_url).await;
            };
            tokio::time::timeout(limit, Self::connect(connection_url))
                .await
                .map_err(|_| Error::OperationFailed {
                    operation: "redis_connect".to_string(),
                    cause: format!(
                        "no connection to {} within {}ms",
                        redact_url(connection_url),
                        limit.as_millis()
                    ),
                })?
        }

        /// Returns a handle for a single request.
        fn conn(&self) -> ConnectionManager {
            self.manager.clone()
        }
    }

    /// Classifies a Redis error.
    fn classify(e: &RedisError) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(e.to_string())
        } else if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() {
            BackendError::Unavailable(e.to_string())
        } else {
            BackendError::Command(e.to_string())
        }
    }

    /// Strips credentials from a Redis URL before logging.
    fn redact_url(url: &str) -> String {
        match (url.find("://"), url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}://***{}", &url[..scheme_end], &url[at..])
            },
            _ => url.to_string(),
        }
    }

    #[async_trait]
    impl SetBackend for RedisSetBackend {
        fn name(&self) -> &'static str {
            "redis"
        }

        async fn add_member(&self, key: &str, member: &str) -> std::result::Result<(), BackendError> {
            let mut conn = self.conn();
            let _added: i64 = redis::cmd("SADD")
                .arg(key)
                .arg(member)
                .query_async(&mut conn)
                .await
                .map_err(|e| classify(&e))?;
            Ok(())
        }

        async fn remove_member(
            &self,
            key: &str,
            member: &str,
        ) -> std::result::Result<(), BackendError> {
            let mut conn = self.conn();
            let _removed: i64 = redis::cmd("SREM")
                .arg(key)
                .arg(member)
                .query_async(&mut conn)
                .await
                .map_err(|e| classify(&e))?;
            Ok(())
        }

        async fn is_member(&self, key: &str, member: &str) -> std::result::Result<bool, BackendError> {
            let mut conn = self.conn();
            redis::cmd("SISMEMBER")
                .arg(key)
                .arg(member)
                .query_async(&mut conn)
                .await
                .map_err(|e| classify(&e))
        }

        async fn delete_key(&self, key: &str) -> std::result::Result<(), BackendError> {
            let mut conn = self.conn();
            let _deleted: i64 = redis::cmd("DEL")
                .arg(key)
                .query_async(&mut conn)
                .await
                .map_err(|e| classify(&e))?;
            Ok(())
        }
    }

}

#[cfg(feature = "redis")]
pub use implementation::RedisSetBackend;

#[cfg(not(feature = "redis"))]
mod stub {
    use crate::backend::{BackendError, SetBackend};
    use crate::{Error, Result};
    use async_trait::async_trait;

    /// Stub Redis set backend when feature is not enabled.
    #[derive(Clone)]
    pub struct RedisSetBackend;

    impl RedisSetBackend {
        /// Connects to Redis (stub).
        ///
        /// # Errors
        ///
        /// Always returns an error because the feature is not enabled.
        pub async fn connect(_connection_url: &str) -> Result<Self> {
            Err(Error::FeatureNotEnabled("redis".to_string()))
        }

        /// Connects to Redis with a time limit (stub).
        ///
        /// # Errors
        ///
        /// Always returns an error because the feature is not enabled.
        pub async fn connect_within(
            connection_url: &str,
            _limit: Option<std::time::Duration>,
        ) -> Result<Self> {
            Self::connect(connection_url).await
        }
    }

    fn disabled() -> BackendError {
        BackendError::Unavailable("redis feature not enabled".to_string())
    }

    #[async_trait]
    impl SetBackend for RedisSetBackend {
        fn name(&self) -> &'static str {
            "redis"
        }

        async fn add_member(&self, _key: &str, _member: &str) -> std::result::Result<(), BackendError> {
            Err(disabled())
        }

        async fn remove_member(
            &self,
            _key: &str,
            _member: &str,
        ) -> std::result::Result<(), BackendError> {
            Err(disabled())
        }

        async fn is_member(&self, _key: &str, _member: &str) -> std::result::Result<bool, BackendError> {
            Err(disabled())
        }

        async fn delete_key(&self, _key: &str) -> std::result::Result<(), BackendError> {
            Err(disabled())
        }
    }

}

#[cfg(not(feature = "redis"))]
pub use stub::RedisSetBackend;
