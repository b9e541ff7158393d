//! Configuration management using config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use steamdash_core::{FilterMode, Language, Query, SortMode, DEFAULT_PAGE_SIZE};

const CONFIG_PATH: &str = "config.toml";
const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the dashboard backend API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Games per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Language for achievement names and descriptions
    #[serde(default)]
    pub language: Language,

    #[serde(default)]
    pub default_sort: SortMode,

    #[serde(default)]
    pub default_filter: FilterMode,

    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            page_size: default_page_size(),
            language: Language::default(),
            default_sort: SortMode::default(),
            default_filter: FilterMode::default(),
            request_timeout_secs: default_timeout(),
        }
    }
}

impl Config {
    /// Load config from ./config.toml, creating a default one if it doesn't exist
    pub fn load() -> Self {
        Self::load_from(Path::new(CONFIG_PATH))
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Error parsing {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Error reading {}: {}", path.display(), e);
                }
            }
            return Config::default();
        }

        let config = Config::default();
        if let Err(e) = config.save_to(path) {
            tracing::debug!("Could not write default config: {}", e);
        }
        config
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Environment variables take precedence over the file
    pub fn apply_env(&mut self) {
        if let Ok(base) = std::env::var("STEAMDASH_API_BASE") {
            if !base.trim().is_empty() {
                self.api_base = base.trim().to_string();
            }
        }
        if let Ok(lang) = std::env::var("STEAMDASH_LANG") {
            match lang.parse() {
                Ok(language) => self.language = language,
                Err(e) => tracing::warn!("Ignoring STEAMDASH_LANG: {}", e),
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.api_base.starts_with("http://") || self.api_base.starts_with("https://")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Initial library query from the configured defaults
    pub fn query(&self) -> Query {
        Query {
            filter: self.default_filter,
            sort: self.default_sort,
            search: String::new(),
            page_size: self.page_size.max(1),
            page: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            page_size = 12
            language = "it"
            default_sort = "completion"
            "#,
        )
        .unwrap();
        assert_eq!(config.page_size, 12);
        assert_eq!(config.language, Language::It);
        assert_eq!(config.default_sort, SortMode::Completion);
        assert_eq!(config.default_filter, FilterMode::All);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert!(config.is_valid());
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path);
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let mut changed = config.clone();
        changed.default_filter = FilterMode::RecentlyPlayed;
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), changed);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "page_size = \"lots\"").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn query_never_has_zero_page_size() {
        let config = Config {
            page_size: 0,
            ..Config::default()
        };
        assert_eq!(config.query().page_size, 1);
        assert!(!Config { api_base: "localhost".into(), ..Config::default() }.is_valid());
    }
}
