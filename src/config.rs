use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::controller::ExchangeOptions;

/// Environment variable that points at an alternative config file.
pub const CONFIG_ENV: &str = "CHATBRIDGE_CONFIG";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub welcome_message: String,
    pub user_name: Option<String>,
    pub error_reply: Option<String>,
    pub fallback_reply: String,
    pub query_timeout_secs: Option<u64>,
    pub ollama_url: String,
    pub fallback_model: Option<String>,
    pub joke_url: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "chatbridge".to_string(),
            welcome_message: "Hi! How can I help you?".to_string(),
            user_name: None,
            error_reply: Some("Sorry, something went wrong.".to_string()),
            fallback_reply: "Sorry, I did not understand that.".to_string(),
            query_timeout_secs: None,
            ollama_url: "http://localhost:11434".to_string(),
            fallback_model: None,
            joke_url: "https://v2.jokeapi.dev/joke/Any?type=single".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from `$CHATBRIDGE_CONFIG` or the default location. A missing file yields defaults.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn exchange_options(&self) -> ExchangeOptions {
        ExchangeOptions {
            error_reply: self.error_reply.clone().filter(|s| !s.is_empty()),
            query_timeout: self.query_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chatbridge").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"user_name": "Ada", "query_timeout_secs": 30}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.user_name.as_deref(), Some("Ada"));
        assert_eq!(config.query_timeout_secs, Some(30));
        assert_eq!(config.welcome_message, Config::default().welcome_message);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            fallback_model: Some("llama3.2".to_string()),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_exchange_options() {
        let config = Config {
            error_reply: Some(String::new()),
            query_timeout_secs: Some(5),
            ..Config::default()
        };
        let options = config.exchange_options();
        assert_eq!(options.error_reply, None);
        assert_eq!(options.query_timeout, Some(Duration::from_secs(5)));
    }
}
