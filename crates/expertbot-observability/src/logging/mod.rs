//! Structured logging on top of `tracing`.
//!
//! The CLI writes to stderr. The terminal UI owns stdout/stderr, so it writes
//! to a daily-rolling file instead.

use std::path::{Path, PathBuf};

use expertbot_config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::error::{ObservabilityError, Result};

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard error, with ANSI colours
    Stderr,
    /// Daily-rolling file; the date is appended to the file name.
    File(PathBuf),
}

/// Keeps the background writer alive. Dropping it flushes pending lines.
#[derive(Debug)]
pub struct LogManager {
    target: LogTarget,
    level: String,
    _guard: Option<WorkerGuard>,
}

impl LogManager {
    /// Install the global subscriber.
    ///
    /// `RUST_LOG` takes precedence over the configured level.
    pub fn init(config: &LoggingConfig, target: LogTarget) -> Result<Self> {
        let level = config.level.to_string();
        let filter = build_filter(&level)?;

        let (layer, guard) = match &target {
            LogTarget::Stderr => (fmt_layer(std::io::stderr, config.json_format, true), None),
            LogTarget::File(path) => {
                let (dir, file_name) = split_log_path(path)?;
                std::fs::create_dir_all(&dir)?;
                let appender = tracing_appender::rolling::daily(dir, file_name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (fmt_layer(writer, config.json_format, false), Some(guard))
            }
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()
            .map_err(|e| ObservabilityError::init(e.to_string()))?;

        tracing::debug!(target: "expertbot_observability", ?target, %level, "logging initialised");

        Ok(Self {
            target,
            level,
            _guard: guard,
        })
    }

    /// Configured destination
    pub fn target(&self) -> &LogTarget {
        &self.target
    }

    /// Configured level (before any `RUST_LOG` override)
    pub fn level(&self) -> &str {
        &self.level
    }
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| ObservabilityError::logging(format!("Invalid log level: {}", e))),
    }
}

fn fmt_layer<W>(writer: W, json: bool, ansi: bool) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(ansi);

    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

fn split_log_path(path: &Path) -> Result<(PathBuf, String)> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ObservabilityError::logging(format!("Invalid log file: {:?}", path)))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((dir, file_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path(Path::new("/var/log/expertbot/tui.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log/expertbot"));
        assert_eq!(name, "tui.log");
    }

    #[test]
    fn test_split_bare_file_name() {
        let (dir, name) = split_log_path(Path::new("tui.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, "tui.log");
    }

    #[test]
    fn test_split_rejects_directory_root() {
        assert!(split_log_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_file_logging_initialises_once() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = LoggingConfig::default();
        let path = temp_dir.path().join("logs").join("test.log");

        let manager = LogManager::init(&config, LogTarget::File(path)).unwrap();
        assert_eq!(manager.level(), "info");
        assert!(temp_dir.path().join("logs").exists());

        let second = LogManager::init(&config, LogTarget::Stderr);
        assert!(matches!(second, Err(ObservabilityError::Init { .. })));
    }
}
