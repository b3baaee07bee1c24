use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::client::DEFAULT_BACKEND_URL;

/// Environment variable that overrides the configured backend URL
pub const BACKEND_URL_ENV: &str = "RAGDASH_BACKEND_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub backend_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub use_hyde: Option<bool>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
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

    /// Persist only the HyDE toggle, keeping whatever else is on disk
    pub fn save_use_hyde(enabled: bool) -> Result<()> {
        Self::save_use_hyde_to(&Self::get_config_path()?, enabled)
    }

    /// Set the HyDE toggle in the file at `path`. An unreadable file is
    /// replaced by defaults carrying just the toggle.
    pub fn save_use_hyde_to(path: &Path, enabled: bool) -> Result<()> {
        let mut config = Self::load_from(path).unwrap_or_else(|_| Self::new());
        config.use_hyde = Some(enabled);
        config.save_to(path)
    }

    /// Backend URL: explicit override, then env var, then config, then default
    pub fn backend_url(&self, cli_override: Option<&str>) -> String {
        let env = std::env::var(BACKEND_URL_ENV).ok();
        resolve_backend_url(cli_override, env.as_deref(), self.backend_url.as_deref())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }

    pub fn use_hyde(&self) -> bool {
        self.use_hyde.unwrap_or(false)
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ragdash").join("config.json"))
    }
}

fn resolve_backend_url(cli: Option<&str>, env: Option<&str>, file: Option<&str>) -> String {
    [cli, env, file]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
        .unwrap_or(DEFAULT_BACKEND_URL)
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert!(!config.use_hyde());
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            backend_url: Some("http://rag.local:5000".to_string()),
            request_timeout_secs: Some(90),
            use_hyde: Some(true),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.request_timeout(), Some(Duration::from_secs(90)));
        assert!(loaded.use_hyde());
    }

    #[test]
    fn test_save_use_hyde_keeps_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragdash").join("config.json");

        Config::save_use_hyde_to(&path, true).unwrap();
        assert!(Config::load_from(&path).unwrap().use_hyde());

        let config = Config {
            backend_url: Some("http://10.0.0.5:5000".to_string()),
            request_timeout_secs: Some(30),
            use_hyde: Some(true),
        };
        config.save_to(&path).unwrap();
        Config::save_use_hyde_to(&path, false).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(!loaded.use_hyde());
        assert_eq!(loaded.backend_url.as_deref(), Some("http://10.0.0.5:5000"));
        assert_eq!(loaded.request_timeout_secs, Some(30));
    }

    #[test]
    fn test_save_use_hyde_over_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        Config::save_use_hyde_to(&path, true).unwrap();
        assert_eq!(
            Config::load_from(&path).unwrap(),
            Config { use_hyde: Some(true), ..Config::new() }
        );
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let config = Config { request_timeout_secs: Some(0), ..Config::new() };
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_backend_url_precedence() {
        assert_eq!(resolve_backend_url(None, None, None), "http://localhost:5000");
        assert_eq!(resolve_backend_url(None, None, Some("http://file:1/")), "http://file:1");
        assert_eq!(resolve_backend_url(None, Some("http://env:2"), Some("http://file:1")), "http://env:2");
        assert_eq!(
            resolve_backend_url(Some("http://cli:3"), Some("http://env:2"), Some("http://file:1")),
            "http://cli:3"
        );
        assert_eq!(resolve_backend_url(Some("  "), None, Some("http://file:1")), "http://file:1");
    }
}
