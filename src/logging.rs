//! Logging initialization.
//!
//! Logs go to stderr unless `logging.to_file` is set, in which case they are
//! written under `<state>/logs` as `wizard.<date>.log`, rotated per
//! `logging.rotation`.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LogRotation};

/// Keeps file logging alive; drop it last
pub struct LoggingHandle {
    /// Flushes buffered file logs when dropped
    pub _guard: Option<WorkerGuard>,

    /// Directory receiving log files, when logging to files
    pub log_dir: Option<PathBuf>,
}

/// Filter directive: `RUST_LOG` first, then `--debug`, then the configured level
fn filter_directive(config: &Config, debug_override: bool) -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if debug_override {
            "debug".to_string()
        } else {
            config.logging.level.clone()
        }
    })
}

fn rotation(config: &Config) -> Rotation {
    match config.logging.rotation {
        LogRotation::Never => Rotation::NEVER,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
    }
}

fn file_appender(config: &Config) -> Result<(RollingFileAppender, PathBuf)> {
    let logs_dir = config.logs_path();
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(rotation(config))
        .filename_prefix("wizard")
        .filename_suffix("log")
        .build(&logs_dir)
        .context("Failed to open log file")?;
    Ok((appender, logs_dir))
}

/// Install the global subscriber
pub fn init_logging(config: &Config, debug_override: bool) -> Result<LoggingHandle> {
    let filter = EnvFilter::new(filter_directive(config, debug_override));

    let (writer, handle) = if config.logging.to_file {
        let (appender, logs_dir) = file_appender(config)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        (
            BoxMakeWriter::new(non_blocking),
            LoggingHandle {
                _guard: Some(guard),
                log_dir: Some(logs_dir),
            },
        )
    } else {
        (
            BoxMakeWriter::new(std::io::stderr),
            LoggingHandle {
                _guard: None,
                log_dir: None,
            },
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(!config.logging.to_file)
                .with_writer(writer),
        )
        .init();

    Ok(handle)
}
