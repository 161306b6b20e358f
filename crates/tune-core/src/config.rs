use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

/// Environment variable that overrides `catalog.base_url`.
pub const CATALOG_URL_ENV: &str = "TUNE_CATALOG_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

/// Where the song catalog and its assets live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the songs collection, relative to `base_url`.
    #[serde(default = "default_songs_path")]
    pub songs_path: String,
    /// Path cover / audio asset ids are resolved against.
    #[serde(default = "default_assets_path")]
    pub assets_path: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Start the next track when the current one finishes.
    #[serde(default = "default_auto_advance")]
    pub auto_advance: bool,
    /// Explicit mpv path; otherwise looked up beside the exe and on PATH.
    #[serde(default)]
    pub mpv_binary: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            songs_path: default_songs_path(),
            assets_path: default_assets_path(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            auto_advance: default_auto_advance(),
            mpv_binary: None,
        }
    }
}

impl CatalogConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

fn default_base_url() -> String {
    "https://cms.samespace.com".to_string()
}

fn default_songs_path() -> String {
    "items/songs".to_string()
}

fn default_assets_path() -> String {
    "assets".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_auto_advance() -> bool {
    true
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        let mut config = if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            config
        } else {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml_str(&content)?
        };

        if let Ok(url) = std::env::var(CATALOG_URL_ENV) {
            config.apply_catalog_url_override(&url);
        }
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Blank values are ignored.
    pub fn apply_catalog_url_override(&mut self, url: &str) {
        let url = url.trim();
        if !url.is_empty() {
            self.catalog.base_url = url.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.catalog.base_url, "https://cms.samespace.com");
        assert_eq!(config.catalog.songs_path, "items/songs");
        assert_eq!(config.catalog.assets_path, "assets");
        assert_eq!(config.catalog.request_timeout(), Duration::from_secs(15));
        assert!(config.player.auto_advance);
        assert!(config.player.mpv_binary.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml_str(
            r#"
            [catalog]
            base_url = "http://localhost:8055"

            [player]
            auto_advance = false
            "#,
        )
        .unwrap();
        assert_eq!(config.catalog.base_url, "http://localhost:8055");
        assert_eq!(config.catalog.songs_path, "items/songs");
        assert!(!config.player.auto_advance);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = Config::default();
        config.player.mpv_binary = Some(PathBuf::from("/opt/mpv/bin/mpv"));
        let text = toml::to_string_pretty(&config).unwrap();
        let back = Config::from_toml_str(&text).unwrap();
        assert_eq!(back.player.mpv_binary, config.player.mpv_binary);
        assert_eq!(back.catalog.base_url, config.catalog.base_url);
    }

    #[test]
    fn test_catalog_url_override() {
        let mut config = Config::default();
        config.apply_catalog_url_override("   ");
        assert_eq!(config.catalog.base_url, "https://cms.samespace.com");
        config.apply_catalog_url_override(" http://127.0.0.1:9000 ");
        assert_eq!(config.catalog.base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_timeout_never_zero() {
        let catalog = CatalogConfig {
            request_timeout_secs: 0,
            ..CatalogConfig::default()
        };
        assert_eq!(catalog.request_timeout(), Duration::from_secs(1));
    }
}
