//! Logging configuration.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter directive.
const DEFAULT_FILTER: &str = "chancache=info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name. Returns `None` for an unknown name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive string.
    pub filter: String,
    /// Optional log file; stderr when unset.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: DEFAULT_FILTER.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Raises the filter to `debug` for this crate.
    #[must_use]
    pub fn verbose(mut self) -> Self {
        self.filter = "chancache=debug".to_string();
        self
    }

    /// Applies `CHANCACHE_LOG`, `CHANCACHE_LOG_FORMAT` and `CHANCACHE_LOG_FILE`.
    ///
    /// `RUST_LOG` is honored when `CHANCACHE_LOG` is unset.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies logging overrides from a key lookup.
    ///
    /// An unknown format name is ignored with a warning; the configured
    /// format stays in effect.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(filter) = lookup("CHANCACHE_LOG")
            .or_else(|| lookup("RUST_LOG"))
            .filter(|v| !v.trim().is_empty())
        {
            self.filter = filter;
        }
        if let Some(v) = lookup("CHANCACHE_LOG_FORMAT") {
            match LogFormat::parse(&v) {
                Some(format) => self.format = format,
                None => tracing::warn!(
                    value = %v,
                    current = ?self.format,
                    "Ignoring unknown CHANCACHE_LOG_FORMAT"
                ),
            }
        }
        if let Some(v) = lookup("CHANCACHE_LOG_FILE").filter(|v| !v.trim().is_empty()) {
            self.file = Some(PathBuf::from(v));
        }
        self
    }

    /// Builds the `EnvFilter` for this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter directive is malformed.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.filter)
            .map_err(|e| Error::InvalidInput(format!("log filter '{}': {e}", self.filter)))
    }
}
