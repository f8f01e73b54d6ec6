//! Application configuration management.
//!
//! Holds the backend endpoint, where translation tables come from, the
//! default language and the request timeout.
//!
//! Configuration is stored at `~/.config/punchcard/config.json`; the client
//! state (token, user id, language) lives next to it in `state.json`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::client::DEFAULT_TIMEOUT_SECS;
use crate::auth::STATE_FILE;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "punchcard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "PUNCHCARD_API_URL";
pub const ENV_LANG: &str = "PUNCHCARD_LANG";

/// Language used when neither the state nor the config names one.
pub const FALLBACK_LANG: &str = "zh-TW";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Script endpoint every action is sent to
    pub api_url: Option<String>,
    /// Directory holding `<lang>.json` translation tables
    pub i18n_dir: Option<PathBuf>,
    /// Base URL serving `<lang>.json`, used when no directory is set
    pub i18n_url: Option<String>,
    pub default_lang: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            i18n_dir: None,
            i18n_url: None,
            default_lang: FALLBACK_LANG.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            debug!(path = %path.display(), "Loaded config");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override fields from the environment. `lookup` is `std::env::var` in
    /// production.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_url = Some(url);
        }
        if let Some(lang) = lookup(ENV_LANG).filter(|v| !v.trim().is_empty()) {
            self.default_lang = lang;
        }
    }

    /// The endpoint, or an error telling the user how to set one.
    pub fn require_api_url(&self) -> Result<&str> {
        self.api_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No API endpoint configured. Set {} or api_url in {}",
                    ENV_API_URL,
                    CONFIG_FILE
                )
            })
    }

    fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    pub fn state_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(STATE_FILE))
    }

    pub fn log_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.require_api_url().is_err());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_url": "https://example.test/exec"}"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.require_api_url().unwrap(), "https://example.test/exec");
        assert_eq!(config.default_lang, FALLBACK_LANG);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.json");
        let config = Config {
            api_url: Some("https://example.test/exec".to_string()),
            i18n_dir: Some(PathBuf::from("/srv/i18n")),
            i18n_url: None,
            default_lang: "en".to_string(),
            request_timeout_secs: 10,
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_API_URL, "https://env.test/exec"), (ENV_LANG, "ja")].into();
        let mut config = Config::default();
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.api_url.as_deref(), Some("https://env.test/exec"));
        assert_eq!(config.default_lang, "ja");

        // Blank values do not clobber
        let mut config = Config::default();
        config.apply_env(|_| Some(" ".to_string()));
        assert!(config.api_url.is_none());
        assert_eq!(config.default_lang, FALLBACK_LANG);
    }
}
