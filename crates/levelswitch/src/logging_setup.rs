//! Tracing subscriber setup
//!
//! Console output goes to stderr so stdout carries only the switch report.
//! When file output is enabled a non-blocking writer appends to a dated file
//! in the configured log directory; the returned [`LogGuard`] must live until
//! the session ends or buffered lines are lost.

use anyhow::{Context, Result};
use levelswitch_core::LogConfig;
use std::fs::File;
use std::path::PathBuf;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

/// Handle to keep the logging worker thread alive
pub struct LogGuard {
    // Kept alive until dropped
    _guard: WorkerGuard,
}

/// Initialize the logging system
pub fn init(config: &LogConfig) -> Result<Option<LogGuard>> {
    // RUST_LOG takes precedence over the configured level
    let filter = EnvFilter::builder()
        .with_default_directive(config.parse_level().into())
        .from_env_lossy();

    let console_layer = config.console_output.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
            .with_filter(filter.clone())
    });

    let file = open_log_file(config)?;
    let log_path = file.as_ref().map(|(path, _, _)| path.clone());
    let (file_layer, guard) = match file {
        Some((_, writer, worker_guard)) => (
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(filter),
            ),
            Some(LogGuard {
                _guard: worker_guard,
            }),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("Logging initialized at level: {}", config.level);
    if let Some(path) = log_path {
        tracing::info!("Log file: {}", path.display());
    }

    Ok(guard)
}

/// Prepare the log directory and open this session's file.
///
/// Runs before the subscriber exists, so progress goes to stderr directly.
fn open_log_file(config: &LogConfig) -> Result<Option<(PathBuf, NonBlocking, WorkerGuard)>> {
    if !config.file_output {
        return Ok(None);
    }

    config
        .ensure_log_directory()
        .context("Failed to create log directory")?;
    match config.cleanup_old_logs() {
        Ok(0) => {}
        Ok(removed) => eprintln!("Removed {} old log files", removed),
        Err(e) => eprintln!("Warning: Failed to cleanup old log files: {}", e),
    }

    let path = config.current_log_path();
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file: {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    eprintln!("Logging to file: {}", path.display());

    Ok(Some((path, writer, guard)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_file_without_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            file_output: false,
            log_directory: dir.path().join("logs"),
            ..Default::default()
        };
        assert!(open_log_file(&config).unwrap().is_none());
        assert!(!config.log_directory.exists());
    }

    #[test]
    fn test_opens_file_in_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            file_output: true,
            log_directory: dir.path().join("logs"),
            ..Default::default()
        };
        let (path, _writer, _guard) = open_log_file(&config).unwrap().expect("file output on");
        assert!(path.exists());
        assert_eq!(path.parent(), Some(config.log_directory.as_path()));
    }
}
