use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            backend: BackendConfig::default(),
            storage: StorageConfig::default(),
            ui: UiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Read a value by dotted key, e.g. `backend.base_url`.
    pub fn get_value(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["version"] => Some(self.version.clone()),
            ["backend", "base_url"] => Some(self.backend.base_url.clone()),
            ["backend", "timeout_seconds"] => {
                self.backend.timeout_seconds.map(|t| t.to_string())
            }
            ["backend", "probe_test_endpoint"] => {
                Some(self.backend.probe_test_endpoint.to_string())
            }
            ["storage", "path"] => self.storage.path.clone(),
            ["ui", "dark_mode"] => Some(self.ui.dark_mode.to_string()),
            ["ui", "tick_rate_ms"] => Some(self.ui.tick_rate_ms.to_string()),
            ["logging", "level"] => Some(self.logging.level.to_string()),
            ["logging", "file"] => self.logging.file.clone(),
            ["logging", "json_format"] => Some(self.logging.json_format.to_string()),
            _ => None,
        }
    }

    /// Write a value by dotted key.
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["backend", "base_url"] => {
                self.backend.base_url = value.trim_end_matches('/').to_string();
            }
            ["backend", "timeout_seconds"] => {
                self.backend.timeout_seconds = Some(parse_number(value)?);
            }
            ["backend", "probe_test_endpoint"] => {
                self.backend.probe_test_endpoint = parse_bool(value)?;
            }
            ["storage", "path"] => {
                self.storage.path = Some(value.to_string());
            }
            ["ui", "dark_mode"] => {
                self.ui.dark_mode = parse_bool(value)?;
            }
            ["ui", "tick_rate_ms"] => {
                self.ui.tick_rate_ms = parse_number(value)?;
            }
            ["logging", "level"] => {
                self.logging.level = value.parse()?;
            }
            ["logging", "file"] => {
                self.logging.file = Some(value.to_string());
            }
            ["logging", "json_format"] => {
                self.logging.json_format = parse_bool(value)?;
            }
            _ => return Err(ConfigError::KeyNotFound(key.to_string())),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::Validation(format!("expected a boolean, got {:?}", value))),
    }
}

fn parse_number(value: &str) -> ConfigResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("expected a whole number, got {:?}", value)))
}

/// Expert-system backend connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    pub base_url: String,
    /// Per-request timeout. `None` waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    /// Post each fresh query to `/api/test` first and log the echo.
    #[serde(default = "default_true")]
    pub probe_test_endpoint: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            timeout_seconds: Some(60),
            probe_test_endpoint: true,
        }
    }
}

/// Durable slot storage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    pub path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: Some("~/.expertbot/storage".to_string()),
        }
    }
}

/// Presentation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    /// Theme used until the user toggles one explicitly.
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,
}

fn default_tick_rate() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            dark_mode: false,
            tick_rate_ms: default_tick_rate(),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::Validation(format!("Invalid log level: {}", s))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Log file used by the terminal UI. The CLI logs to stderr.
    pub file: Option<String>,
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: Some("~/.expertbot/logs/expertbot.log".to_string()),
            json_format: false,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, "http://localhost:8002");
        assert_eq!(config.backend.timeout_seconds, Some(60));
        assert!(config.backend.probe_test_endpoint);
        assert!(!config.ui.dark_mode);
    }

    #[test]
    fn test_get_and_set_value() {
        let mut config = Config::default();
        config
            .set_value("backend.base_url", "http://expert.local:9000/")
            .unwrap();
        assert_eq!(
            config.get_value("backend.base_url").as_deref(),
            Some("http://expert.local:9000")
        );

        config.set_value("ui.dark_mode", "on").unwrap();
        assert_eq!(config.get_value("ui.dark_mode").as_deref(), Some("true"));

        config.set_value("logging.level", "WARNING").unwrap();
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_set_value_rejects_bad_input() {
        let mut config = Config::default();
        assert!(matches!(
            config.set_value("backend.timeout_seconds", "soon"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            config.set_value("ui.colour", "red"),
            Err(ConfigError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"version":"0.1.0","backend":{"base_url":"http://x"}}"#)
                .unwrap();
        assert_eq!(config.backend.base_url, "http://x");
        assert!(config.backend.probe_test_endpoint);
        assert_eq!(config.ui.tick_rate_ms, 100);
        assert_eq!(config.storage, StorageConfig::default());
    }
}
