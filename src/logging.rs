//! Logging setup for the `scanlens` binary.
//!
//! Logs always go to stderr so that stdout stays clean for JSON/Markdown
//! output. A daily rolling log file can be added on request.
//!
//! ## Usage
//!
//! ```no_run
//! use scanlens::logging;
//!
//! // -v once: debug, twice: trace. RUST_LOG overrides both.
//! let _guard = logging::init(1, None)?;
//!
//! tracing::info!("resolving dataset");
//! # Ok::<(), scanlens::error::ScanError>(())
//! ```

use crate::error::{Result, ResultExt as _, ScanError};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

const LOG_FILE_PREFIX: &str = "scanlens";
const MAX_LOG_FILES: usize = 10;

/// Gets the log directory path based on platform conventions
///
/// Returns:
/// - Windows: `%APPDATA%/scanlens/logs`
/// - macOS: `~/Library/Application Support/scanlens/logs`
/// - Linux: `~/.local/share/scanlens/logs`
///
/// # Errors
///
/// Fails if the platform has no data directory or it cannot be created.
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir()
        .ok_or_else(|| ScanError::Config("failed to determine data directory".to_owned()))?;

    let log_dir = base_dir.join("scanlens").join("logs");
    ensure_dir(&log_dir)?;
    Ok(log_dir)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    }
    Ok(())
}

/// Default filter directive for a `-v` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initializes the global subscriber.
///
/// `verbosity` picks the default level (see [`default_directive`]); `RUST_LOG`
/// wins when set. When `log_dir` is given, a daily rolling `scanlens.log` is
/// written there as well, and the returned guard must be held until exit so
/// buffered lines are flushed.
///
/// # Errors
///
/// Fails if the log directory cannot be created, the file appender cannot
/// be built, or a global subscriber is already installed.
pub fn init(verbosity: u8, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbosity)))
        .map_err(|e| ScanError::Config(format!("invalid log filter: {e}")))?;

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_line_number(verbosity > 0)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            ensure_dir(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(MAX_LOG_FILES)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix("log")
                .build(dir)
                .map_err(|e| ScanError::Config(format!("failed to create log file: {e}")))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ScanError::Config(format!("failed to install log subscriber: {e}")))?;

    if let Some(dir) = log_dir {
        tracing::debug!("logging to {}", dir.display());
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_log_dir() {
        let log_dir = get_log_dir().unwrap();
        assert!(log_dir.ends_with("scanlens/logs") || log_dir.ends_with("scanlens\\logs"));
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(default_directive(0), "info");
        assert_eq!(default_directive(1), "debug");
        assert_eq!(default_directive(5), "trace");
    }
}
