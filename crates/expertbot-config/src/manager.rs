use crate::config::{Config, ConfigError, ConfigResult};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

static ENV_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Loads, holds and saves the configuration file.
#[derive(Clone)]
pub struct ConfigManager {
    path: PathBuf,
    config: Arc<RwLock<Config>>,
}

impl ConfigManager {
    /// Load the file at `path`, writing defaults there first if it is missing.
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let config = if path.exists() {
            debug!("Reading config {:?}", path);
            read_config(path).await?
        } else {
            info!("No config at {:?}, writing defaults", path);
            let defaults = Config::default();
            write_config(path, &defaults).await?;
            defaults
        };

        Ok(Self::new(config, path.to_path_buf()))
    }

    /// Load from `~/.expertbot/config.json`.
    pub async fn load_default() -> ConfigResult<Self> {
        Self::load(&Self::default_config_path()?).await
    }

    pub fn default_config_path() -> ConfigResult<PathBuf> {
        crate::default_config_path()
            .ok_or_else(|| ConfigError::InvalidPath("Could not find home directory".to_string()))
    }

    /// Wrap an in-memory config without touching the file system.
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub fn get(&self) -> Arc<RwLock<Config>> {
        Arc::clone(&self.config)
    }

    /// Copy of the current configuration.
    pub async fn snapshot(&self) -> Config {
        self.config.read().await.clone()
    }

    pub async fn save(&self) -> ConfigResult<()> {
        let snapshot = self.snapshot().await;
        write_config(&self.path, &snapshot).await?;
        debug!("Wrote config {:?}", self.path);
        Ok(())
    }

    /// Re-read the file, keeping the current values if it is missing or
    /// invalid.
    pub async fn reload(&self) -> ConfigResult<()> {
        if !self.path.is_file() {
            return Err(ConfigError::InvalidPath(format!(
                "{} does not exist",
                self.path.display()
            )));
        }

        let fresh = read_config(&self.path).await?;
        *self.config.write().await = fresh;
        info!("Reloaded config {:?}", self.path);
        Ok(())
    }

    /// Apply `f`, validate the result and save. Nothing changes if `f` fails
    /// or the result is invalid.
    pub async fn update<F>(&self, f: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config) -> ConfigResult<()>,
    {
        {
            let mut current = self.config.write().await;
            let mut candidate = current.clone();
            f(&mut candidate)?;
            Self::validate(&candidate)?;
            *current = candidate;
        }
        self.save().await
    }

    pub fn validate(config: &Config) -> ConfigResult<()> {
        let base_url = config.backend.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::Validation(
                "backend.base_url cannot be empty".to_string(),
            ));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "backend.base_url must be an http(s) URL: {}",
                base_url
            )));
        }

        if config.backend.timeout_seconds == Some(0) {
            return Err(ConfigError::Validation(
                "backend.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if config.ui.tick_rate_ms == 0 {
            return Err(ConfigError::Validation(
                "ui.tick_rate_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Expand `${VAR}` and `${VAR:-default}`.
    fn expand_env_vars(content: &str) -> ConfigResult<String> {
        let mut missing = None;
        let expanded = ENV_VAR.replace_all(content, |caps: &Captures| {
            let expr = &caps[1];
            let (name, fallback) = match expr.split_once(":-") {
                Some((name, fallback)) => (name, Some(fallback)),
                None => (expr, None),
            };
            match (std::env::var(name), fallback) {
                (Ok(value), _) => value,
                (Err(_), Some(fallback)) => fallback.to_string(),
                (Err(_), None) => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(name) => Err(ConfigError::EnvVarNotFound(name)),
            None => Ok(expanded.into_owned()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn read_config(path: &Path) -> ConfigResult<Config> {
    let raw = tokio::fs::read_to_string(path).await?;
    let config: Config = serde_json::from_str(&ConfigManager::expand_env_vars(&raw)?)?;
    ConfigManager::validate(&config)?;
    Ok(config)
}

/// Write through a sibling temp file so a crash never truncates the config.
async fn write_config(path: &Path, config: &Config) -> ConfigResult<()> {
    let json = serde_json::to_string_pretty(config)?;
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_creates_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let manager = ConfigManager::load(&config_path).await.unwrap();
        let config = manager.snapshot().await;

        assert!(config_path.exists());
        assert_eq!(config.backend.base_url, "http://localhost:8002");
    }

    #[tokio::test]
    async fn test_update_persists() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let manager = ConfigManager::load(&config_path).await.unwrap();
        manager
            .update(|config| config.set_value("ui.dark_mode", "true"))
            .await
            .unwrap();

        let reloaded = ConfigManager::load(&config_path).await.unwrap();
        assert!(reloaded.snapshot().await.ui.dark_mode);
    }

    #[tokio::test]
    async fn test_invalid_update_is_discarded() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let manager = ConfigManager::load(&config_path).await.unwrap();
        let result = manager
            .update(|config| config.set_value("backend.base_url", "ftp://nowhere"))
            .await;

        assert!(result.is_err());
        assert_eq!(
            manager.snapshot().await.backend.base_url,
            "http://localhost:8002"
        );
    }

    #[tokio::test]
    async fn test_reload_picks_up_edits() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let manager = ConfigManager::load(&config_path).await.unwrap();

        let mut edited = Config::default();
        edited.backend.base_url = "http://kb.internal:9000".to_string();
        tokio::fs::write(&config_path, serde_json::to_string(&edited).unwrap())
            .await
            .unwrap();

        manager.reload().await.unwrap();
        assert_eq!(
            manager.snapshot().await.backend.base_url,
            "http://kb.internal:9000"
        );
        assert!(!config_path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("EXPERTBOT_TEST_URL", "http://expert.test");

        let content = r#"{"base_url": "${EXPERTBOT_TEST_URL}", "other": "${EXPERTBOT_UNSET_VAR:-fallback}"}"#;
        let expanded = ConfigManager::expand_env_vars(content).unwrap();

        assert!(expanded.contains("http://expert.test"));
        assert!(expanded.contains("fallback"));
    }

    #[test]
    fn test_missing_env_var_is_an_error() {
        let result = ConfigManager::expand_env_vars("${EXPERTBOT_SURELY_UNSET}");
        assert!(matches!(result, Err(ConfigError::EnvVarNotFound(_))));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(ConfigManager::validate(&config).is_ok());

        config.backend.timeout_seconds = Some(0);
        assert!(ConfigManager::validate(&config).is_err());

        config.backend.timeout_seconds = None;
        config.ui.tick_rate_ms = 0;
        assert!(ConfigManager::validate(&config).is_err());
    }
}
