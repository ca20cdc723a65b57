//! Logging configuration and initialization for GG-ACTUATOR.
//!
//! One registry carries three layers: the logger-level gate, the console
//! output (JSON or pretty, filtered by `LogConfig::level`), and a plain-text
//! layer writing into the actuator's logfile ring buffer.

use std::path::PathBuf;

use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::logfile::LogfileMakeWriter;
use crate::loggers::LoggerLevelLayer;
use crate::Actuator;

/// Console output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging (default for production).
    #[default]
    Json,
    /// Human-readable pretty printing (for development).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Console output format (JSON or Pretty).
    pub format: LogFormat,
    /// Console filter (e.g., "info", "debug", "gg_actuator=trace").
    pub level: String,
    /// Optional file path for console output. If None, logs to stderr.
    pub output_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
            output_path: None,
        }
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
    #[error("Failed to open log file: {0}")]
    FileOpen(String),
    #[error("Subscriber already initialized")]
    AlreadyInitialized,
}

/// Build the subscriber without installing it.
pub fn build_subscriber(
    config: &LogConfig,
    actuator: &Actuator,
) -> Result<impl Subscriber + Send + Sync + 'static, LogError> {
    let filter =
        EnvFilter::try_new(&config.level).map_err(|e| LogError::InvalidFilter(e.to_string()))?;

    let console = match (config.format, &config.output_path) {
        (LogFormat::Json, Some(path)) => {
            let file = std::fs::File::create(path).map_err(|e| LogError::FileOpen(e.to_string()))?;
            fmt::layer()
                .json()
                .with_writer(std::sync::Mutex::new(file))
                .with_filter(filter)
                .boxed()
        }
        (LogFormat::Json, None) => fmt::layer().json().with_filter(filter).boxed(),
        (LogFormat::Pretty, _) => fmt::layer().pretty().with_filter(filter).boxed(),
    };

    let logfile = fmt::layer()
        .with_ansi(false)
        .with_writer(LogfileMakeWriter::new(actuator.log_buffer()));

    Ok(tracing_subscriber::registry()
        .with(LoggerLevelLayer::new(actuator.logger_bridge()))
        .with(console)
        .with(logfile))
}

/// Install the actuator's subscriber as the global default.
///
/// This should be called once at application startup.
pub fn init_logging(config: &LogConfig, actuator: &Actuator) -> Result<(), LogError> {
    build_subscriber(config, actuator)?
        .try_init()
        .map_err(|_| LogError::AlreadyInitialized)
}
