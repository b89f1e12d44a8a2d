//! Configuration management.
//!
//! Sources, later ones winning:
//! 1. Built-in defaults
//! 2. `config.toml` (explicit path, or the platform config dir)
//! 3. `CHANCACHE_*` environment variables
//!
//! ```toml
//! redis_url = "redis://localhost:6379"
//! key_prefix = "channel"
//! operation_timeout_ms = 5000
//!
//! [logging]
//! format = "json"
//! filter = "chancache=debug"
//!
//! [resilience]
//! enabled = true
//! breaker_failure_threshold = 5
//! ```

use crate::cache::CHANNEL_KEY_PREFIX;
use crate::context::CallContext;
use crate::observability::{LogFormat, LoggingConfig};
use crate::resilience::CacheResilienceConfig;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default Redis URL.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Default per-operation timeout in milliseconds.
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 5_000;

/// Main configuration for chancache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Redis connection URL.
    pub redis_url: String,
    /// Namespace prefix for channel keys.
    pub key_prefix: String,
    /// Default deadline applied by [`CacheConfig::call_context`]. Zero disables it.
    pub operation_timeout_ms: u64,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Circuit breaker configuration.
    pub resilience: CacheResilienceConfig,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Redis connection URL.
    pub redis_url: Option<String>,
    /// Key prefix.
    pub key_prefix: Option<String>,
    /// Operation timeout in milliseconds.
    pub operation_timeout_ms: Option<u64>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
    /// Resilience section.
    pub resilience: Option<CacheResilienceConfig>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Output format.
    pub format: Option<LogFormat>,
    /// Filter directive.
    pub filter: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            key_prefix: CHANNEL_KEY_PREFIX.to_string(),
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            logging: LoggingConfig::default(),
            resilience: CacheResilienceConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        let config = Self::from_config_file(file);
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/.config/chancache/config.toml` on Linux)
    /// 2. `~/.config/chancache/config.toml`
    ///
    /// Returns default configuration if no readable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("chancache").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("chancache")
                .join("config.toml"),
        ];

        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                },
            }
        }

        Self::default()
    }

    /// Loads from `path` if given, else the default location, then applies env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file cannot be loaded or the result is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default(),
        }
        .with_env_overrides();

        config.validate()?;
        Ok(config)
    }

    /// Converts a `ConfigFile` to `CacheConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(redis_url) = file.redis_url {
            config.redis_url = redis_url;
        }
        if let Some(key_prefix) = file.key_prefix {
            config.key_prefix = key_prefix;
        }
        if let Some(timeout) = file.operation_timeout_ms {
            config.operation_timeout_ms = timeout;
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format {
                config.logging.format = format;
            }
            if let Some(filter) = logging.filter {
                config.logging.filter = filter;
            }
            config.logging.file = logging.file.map(PathBuf::from);
        }
        if let Some(resilience) = file.resilience {
            config.resilience = resilience;
        }

        config
    }

    /// Applies `CHANCACHE_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        let mut config = self.with_overrides(|key| std::env::var(key).ok());
        config.logging = config.logging.with_env_overrides();
        config
    }

    /// Applies overrides for the cache settings from a key lookup.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("CHANCACHE_REDIS_URL").filter(|v| !v.trim().is_empty()) {
            self.redis_url = url;
        }
        if let Some(prefix) = lookup("CHANCACHE_KEY_PREFIX") {
            self.key_prefix = prefix;
        }
        if let Some(timeout) = lookup("CHANCACHE_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok())
        {
            self.operation_timeout_ms = timeout;
        }
        self.resilience = self.resilience.with_overrides(&lookup);
        self
    }

    /// Checks invariants the cache relies on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty key prefix or Redis URL.
    pub fn validate(&self) -> Result<()> {
        if self.key_prefix.trim().is_empty() {
            return Err(Error::InvalidInput(
                "key_prefix must not be empty".to_string(),
            ));
        }
        if self.redis_url.trim().is_empty() {
            return Err(Error::InvalidInput("redis_url must not be empty".to_string()));
        }
        Ok(())
    }

    /// Default per-operation timeout, if any.
    #[must_use]
    pub const fn operation_timeout(&self) -> Option<Duration> {
        if self.operation_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.operation_timeout_ms))
        }
    }

    /// Builds a fresh call context carrying the default timeout.
    #[must_use]
    pub fn call_context(&self) -> CallContext {
        let ctx = CallContext::new();
        match self.operation_timeout() {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    /// Sets the Redis URL.
    #[must_use]
    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }

    /// Sets the key prefix.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}
