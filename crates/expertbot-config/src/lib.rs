pub mod config;
pub mod manager;

pub use config::{
    BackendConfig, Config, ConfigError, ConfigResult, LogLevel, LoggingConfig, StorageConfig,
    UiConfig,
};
pub use manager::ConfigManager;

use std::path::PathBuf;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "EXPERTBOT_CONFIG";

/// `~/.expertbot`
pub fn expertbot_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".expertbot"))
}

pub fn default_config_path() -> Option<PathBuf> {
    expertbot_dir().map(|dir| dir.join("config.json"))
}

pub fn default_storage_dir() -> Option<PathBuf> {
    expertbot_dir().map(|dir| dir.join("storage"))
}

pub fn default_log_path() -> Option<PathBuf> {
    expertbot_dir().map(|dir| dir.join("logs").join("expertbot.log"))
}

/// Create the `~/.expertbot` directory tree.
pub async fn init_expertbot_dirs() -> ConfigResult<()> {
    if let Some(root) = expertbot_dir() {
        tokio::fs::create_dir_all(&root).await?;
        tokio::fs::create_dir_all(root.join("storage")).await?;
        tokio::fs::create_dir_all(root.join("logs")).await?;
    }
    Ok(())
}

/// Expand a leading `~/` to the home directory.
pub fn expand_tilde(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expertbot_dir() {
        let dir = expertbot_dir();
        assert!(dir.is_some());
        assert!(dir.unwrap().to_string_lossy().contains(".expertbot"));
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde("~/.expertbot/config.json").unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with(".expertbot/config.json"));
    }

    #[test]
    fn test_plain_path_is_untouched() {
        assert_eq!(
            expand_tilde("/tmp/expertbot").unwrap(),
            PathBuf::from("/tmp/expertbot")
        );
    }
}
