//! Application configuration.
//!
//! Stored at `<config dir>/mmcdesk/config.json`. Command-line and
//! environment overrides are applied by the caller.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "mmcdesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when neither the environment nor the file names one
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub last_username: Option<String>,
    #[serde(default)]
    pub remember_login: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
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
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Backend base URL without a trailing slash: `override_url` when
    /// given and non-blank, else the configured URL, else the default.
    pub fn base_url_or(&self, override_url: Option<&str>) -> String {
        resolve_base_url(override_url, self.api_base_url.as_deref())
    }

    /// Default directory for the session store, cookie jar and logs.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

fn resolve_base_url(override_url: Option<&str>, configured: Option<&str>) -> String {
    [override_url, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
        .unwrap_or(DEFAULT_API_BASE_URL)
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_precedence() {
        assert_eq!(
            resolve_base_url(Some("https://api.example.com/"), Some("http://other")),
            "https://api.example.com"
        );
        assert_eq!(resolve_base_url(Some("  "), Some("http://other:8080")), "http://other:8080");
        assert_eq!(resolve_base_url(None, None), DEFAULT_API_BASE_URL);

        let config = Config {
            api_base_url: Some("http://files.local/".to_string()),
            ..Config::default()
        };
        assert_eq!(config.base_url_or(None), "http://files.local");
        assert_eq!(config.base_url_or(Some("http://cli.local")), "http://cli.local");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        assert_eq!(Config::load_from(&path).unwrap(), Config::default());

        let config = Config {
            api_base_url: Some("https://api.example.com".to_string()),
            last_username: Some("amy".to_string()),
            remember_login: true,
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_fields_default() {
        let config: Config = serde_json::from_str(r#"{"last_username":"amy"}"#).unwrap();
        assert!(!config.remember_login);
        assert_eq!(config.api_base_url, None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
