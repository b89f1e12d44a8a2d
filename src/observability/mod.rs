//! Observability: structured logging and operation metrics.
//!
//! Logging goes through `tracing`; [`init`] installs a `tracing-subscriber`
//! registry for binaries. Libraries embedding the cache install their own.
//!
//! Metrics go through the `metrics` facade. No exporter is installed here;
//! the host process decides where they go.
//!
//! | Metric | Kind | Labels |
//! |--------|------|--------|
//! | `chancache_operations_total` | counter | `operation`, `status` |
//! | `chancache_operation_duration_ms` | histogram | `operation` |
//! | `chancache_breaker_rejections_total` | counter | `operation`, `backend` |
//! | `chancache_breaker_trips_total` | counter | `backend`, `operation` |
//! | `chancache_breaker_state` | gauge | `backend` |

mod logging;

pub use logging::{LogFormat, LoggingConfig};

use crate::cache::CacheOperation;
use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static OBSERVABILITY_INIT: OnceLock<()> = OnceLock::new();

/// Metric status label for an operation outcome.
#[must_use]
pub fn status_label<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(Error::CacheWrite { .. }) => "write_failed",
        Err(Error::ReadDegraded { .. }) => "degraded",
        Err(Error::Cancelled { .. }) => "cancelled",
        Err(Error::DeadlineExceeded { .. }) => "deadline_exceeded",
        Err(_) => "error",
    }
}

/// Records one cache operation.
pub fn record_operation<T>(operation: CacheOperation, result: &Result<T>, elapsed: Duration) {
    metrics::counter!(
        "chancache_operations_total",
        "operation" => operation.as_str(),
        "status" => status_label(result)
    )
    .increment(1);
    metrics::histogram!("chancache_operation_duration_ms", "operation" => operation.as_str())
        .record(elapsed.as_secs_f64() * 1000.0);
}

/// Initializes logging for the process.
///
/// # Errors
///
/// Returns an error if logging was already initialized, the log file cannot
/// be opened, or another global subscriber is installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    if OBSERVABILITY_INIT.get().is_some() {
        return Err(Error::OperationFailed {
            operation: "observability_init".to_string(),
            cause: "observability already initialized".to_string(),
        });
    }

    let filter = config.env_filter()?;

    match (&config.file, config.format) {
        (Some(log_file), LogFormat::Json) => {
            let writer = open_log_file(log_file)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_current_span(true)
                        .with_target(true),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        },
        (Some(log_file), LogFormat::Pretty) => {
            let writer = open_log_file(log_file)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        },
        (None, LogFormat::Json) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_current_span(true)
                        .with_target(true),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        },
        (None, LogFormat::Pretty) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(true),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        },
    }

    OBSERVABILITY_INIT
        .set(())
        .map_err(|()| Error::OperationFailed {
            operation: "observability_init".to_string(),
            cause: "failed to mark observability initialized".to_string(),
        })
}

/// Thread-safe file writer for logging.
#[derive(Clone)]
struct LogFileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Opens a log file for appending.
fn open_log_file(path: &Path) -> Result<LogFileWriter> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
            operation: "create_log_dir".to_string(),
            cause: e.to_string(),
        })?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::OperationFailed {
            operation: "open_log_file".to_string(),
            cause: format!("{}: {}", path.display(), e),
        })?;

    Ok(LogFileWriter {
        file: Arc::new(Mutex::new(file)),
    })
}

#[allow(clippy::needless_pass_by_value)]
fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::OperationFailed {
        operation: "observability_init".to_string(),
        cause: e.to_string(),
    }
}
