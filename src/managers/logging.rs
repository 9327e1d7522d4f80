//! Logging setup
//!
//! Provides:
//! - Console: stderr, text or JSON, passed through the redaction filter
//! - File: optional daily rotation in `global.log_directory`, also redacted

use crate::config::{expand_tilde, GlobalConfig};
use crate::utils::output::Terminal;
use anyhow::{bail, Context, Result};
use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

const LOG_FILE_PREFIX: &str = "standard-backups";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    /// JSON lines on the console instead of text
    pub json: bool,
    /// ANSI colours on the console
    pub color: bool,
    /// Directory for log files, if file logging is enabled
    pub log_directory: Option<PathBuf>,
    /// Maximum number of log files to keep
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json: false,
            color: true,
            log_directory: None,
            max_files: 10,
        }
    }
}

impl LoggingConfig {
    /// Combine the global config with command line overrides.
    /// The command line level wins over the configured one.
    pub fn from_config(global: &GlobalConfig, cli_level: Option<&str>) -> Result<Self> {
        let level = match cli_level.or(global.log_level.as_deref()) {
            Some(level) => parse_level(level)?,
            None => Level::INFO,
        };

        Ok(Self {
            level,
            log_directory: global.log_directory.clone(),
            max_files: global.log_max_files,
            ..Default::default()
        })
    }
}

/// Parse a level name such as `info` or `WARN`
pub fn parse_level(level: &str) -> Result<Level> {
    Ok(match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        other => bail!("invalid log level {:?}", other),
    })
}

/// Install the global subscriber. Keep the returned guard alive until exit,
/// file output is flushed when it drops.
pub fn init_logging(config: &LoggingConfig, terminal: &Terminal) -> Result<LogGuard> {
    let console_terminal = terminal.clone();
    let console_writer = move || console_terminal.stderr();

    let console_layer = if config.json {
        fmt::layer()
            .json()
            .with_writer(console_writer)
            .with_current_span(true)
            .with_span_list(false)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(console_writer)
            .with_ansi(config.color)
            .with_target(false)
            .with_level(true)
            .with_span_events(FmtSpan::NONE)
            .boxed()
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> =
        vec![console_layer.with_filter(level_filter(config.level)).boxed()];

    let mut file_guard = None;
    if let Some(directory) = &config.log_directory {
        let log_dir = expand_tilde(directory);
        fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

        let file_appender = RollingFileAppender::new(
            Rotation::DAILY,
            &log_dir,
            format!("{}.log", LOG_FILE_PREFIX),
        );

        // Secrets are scrubbed before the bytes reach the appender thread
        let (non_blocking, guard) =
            tracing_appender::non_blocking(terminal.redactor().writer(file_appender));
        file_guard = Some(guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .with_span_events(FmtSpan::NONE)
            .with_filter(level_filter(config.level))
            .boxed();
        layers.push(file_layer);

        cleanup_old_logs(&log_dir, config.max_files)?;
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Create a level filter for tracing layers. `RUST_LOG` takes precedence.
fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Delete rotated log files beyond the newest `max_files`
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    let mut log_files: Vec<(Option<SystemTime>, PathBuf)> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| is_log_file(&entry.file_name().to_string_lossy()))
        .map(|entry| (entry.metadata().and_then(|m| m.modified()).ok(), entry.path()))
        .collect();

    log_files.sort_by_key(|(modified, _)| Reverse(*modified));

    for (_, path) in log_files.into_iter().skip(max_files as usize) {
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!(file = ?path, "Removed old log file"),
            Err(e) => tracing::warn!(file = ?path, "Failed to remove old log file: {}", e),
        }
    }

    Ok(())
}

fn is_log_file(name: &str) -> bool {
    name.starts_with(LOG_FILE_PREFIX) && name.contains(".log")
}

/// Flushes the file writer on drop
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}
