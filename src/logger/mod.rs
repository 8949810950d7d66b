//! Logger module
//!
//! Installs the process-wide `tracing` subscriber once at start-up and
//! provides [`Logger`], the handle the router receives at construction for
//! result and access logging.

mod format;

pub use format::{AccessLogEntry, AccessLogFormat};

use crate::config::{Config, LoggingConfig};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;

const ACCESS_TARGET: &str = "faceapi::access";

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("failed to open log file: {0}")]
    Io(#[from] io::Error),
    #[error("invalid log level: {0}")]
    Level(#[from] tracing_subscriber::filter::ParseError),
    #[error("{0}")]
    Format(String),
    #[error("failed to install subscriber: {0}")]
    Install(String),
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`. Output goes to
/// `logging.log_file` when set, stdout otherwise.
pub fn init(config: &LoggingConfig) -> Result<(), LoggerError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.log_file.as_deref() {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(open_log_file(path)?))
            .try_init(),
        None => builder.try_init(),
    };
    installed.map_err(|e| LoggerError::Install(e.to_string()))
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Logging capability handed to the request path.
#[derive(Debug, Clone)]
pub struct Logger {
    access_log: bool,
    access_format: AccessLogFormat,
}

impl Logger {
    pub fn new(config: &LoggingConfig) -> Result<Self, LoggerError> {
        Ok(Self {
            access_log: config.access_log,
            access_format: config
                .access_log_format
                .parse()
                .map_err(LoggerError::Format)?,
        })
    }

    /// Log an operation result at debug level. The value is only serialized
    /// when debug output is enabled.
    pub fn debug_result<T: Serialize + ?Sized>(&self, operation: &str, result: &T) {
        if !tracing::enabled!(Level::DEBUG) {
            return;
        }
        match serde_json::to_string(result) {
            Ok(json) => tracing::debug!(operation, result = %json, "operation completed"),
            Err(e) => tracing::warn!(operation, "failed to serialize result for logging: {e}"),
        }
    }

    pub fn access(&self, entry: &AccessLogEntry) {
        if self.access_log {
            tracing::info!(target: ACCESS_TARGET, "{}", entry.format(self.access_format));
        }
    }

    pub fn server_start(&self, addr: &SocketAddr, config: &Config) {
        tracing::info!("face analysis API listening on http://{addr}");
        tracing::info!(
            backend = %config.service.base_url,
            workers = ?config.server.workers,
            max_connections = ?config.performance.max_connections,
            max_body_size = config.http.max_body_size,
            cors = config.http.enable_cors,
            "configuration loaded"
        );
        if let Some(ref path) = config.logging.log_file {
            tracing::info!("log file: {path}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging_config(format: &str) -> LoggingConfig {
        LoggingConfig {
            level: "debug".to_string(),
            access_log: true,
            access_log_format: format.to_string(),
            log_file: None,
        }
    }

    #[test]
    fn test_logger_rejects_unknown_format() {
        assert!(Logger::new(&logging_config("json")).is_ok());
        assert!(matches!(
            Logger::new(&logging_config("fancy")),
            Err(LoggerError::Format(_))
        ));
    }

    #[test]
    fn test_debug_result_without_subscriber() {
        // No subscriber installed: must be a silent no-op
        let logger = Logger::new(&logging_config("combined")).unwrap();
        logger.debug_result("verify", &serde_json::json!({"verified": true}));
    }

    #[test]
    fn test_open_log_file_creates_parents() {
        let dir = std::env::temp_dir().join(format!("faceapi-log-{}", std::process::id()));
        let path = dir.join("nested").join("server.log");
        let file = open_log_file(path.to_str().unwrap());
        assert!(file.is_ok());
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(dir);
    }
}
