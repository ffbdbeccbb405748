//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `PAPER_SCRAPER_*` environment variables (nested keys separated by `__`,
//! e.g. `PAPER_SCRAPER_HARVEST__BATCH_SIZE=5`). The legacy variables
//! `SEMANTIC_SCHOLAR_API_KEY` and `DOI2PDF` fill the API key and the DOI
//! fallback mirror when nothing else sets them.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api_keys]
//! semantic_scholar = "your-api-key"
//!
//! [doi]
//! resolver_base = "https://doi.org"
//! fallback_base = "https://mirror.example"
//!
//! [downloads]
//! directory = "./papers"
//!
//! [harvest]
//! limit = 10
//! page_size = 100
//! batch_size = 10
//!
//! [http]
//! timeout_secs = 30
//! connect_timeout_secs = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::DEFAULT_USER_AGENT;

/// Name of the per-project configuration file
pub const CONFIG_FILE_NAME: &str = "paper-scraper.toml";

/// Largest page the search API serves
pub const MAX_PAGE_SIZE: usize = 100;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// API keys for various services
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// DOI resolution settings
    #[serde(default)]
    pub doi: DoiConfig,

    /// Download settings
    #[serde(default)]
    pub downloads: DownloadConfig,

    /// Pagination and batching
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Check settings that would otherwise fail deep inside a harvest.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.harvest.page_size == 0 || self.harvest.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "harvest.page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.harvest.page_size
            )));
        }
        if self.harvest.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "harvest.batch_size must be at least 1".to_string(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as TOML with secrets masked.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.api_keys.semantic_scholar.is_some() {
            shown.api_keys.semantic_scholar = Some("********".to_string());
        }
        toml::to_string_pretty(&shown).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Fill unset values from the legacy environment variables.
    fn apply_legacy_env(&mut self) {
        if self.api_keys.semantic_scholar.is_none() {
            self.api_keys.semantic_scholar = env_value("SEMANTIC_SCHOLAR_API_KEY");
        }
        if self.doi.fallback_base.is_none() {
            self.doi.fallback_base = env_value("DOI2PDF");
        }
    }
}

/// API keys for external services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Semantic Scholar API key (optional, for higher rate limits)
    #[serde(default)]
    pub semantic_scholar: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            semantic_scholar: env_value("SEMANTIC_SCHOLAR_API_KEY"),
        }
    }
}

/// DOI resolution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoiConfig {
    /// Resolver tried first
    #[serde(default = "default_resolver_base")]
    pub resolver_base: String,

    /// Mirror consulted when the resolver does not lead to a PDF
    #[serde(default)]
    pub fallback_base: Option<String>,
}

impl Default for DoiConfig {
    fn default() -> Self {
        Self {
            resolver_base: default_resolver_base(),
            fallback_base: env_value("DOI2PDF"),
        }
    }
}

fn default_resolver_base() -> String {
    "https://doi.org".to_string()
}

/// Download configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory PDFs are written to
    #[serde(default = "default_download_dir")]
    pub directory: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: default_download_dir(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Pagination and batching defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Number of PDFs to retrieve
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Search results requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Papers retrieved concurrently
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            page_size: default_page_size(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_limit() -> usize {
    10
}

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

fn default_batch_size() -> usize {
    10
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Locate a configuration file: `./paper-scraper.toml`, then
/// `<config dir>/paper-scraper/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("paper-scraper").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Load configuration from `path` (required) or from the default locations
/// (optional), then apply environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    match path {
        Some(path) => {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        None => {
            if let Some(found) = find_config_file() {
                tracing::debug!("Using configuration file {}", found.display());
                builder = builder.add_source(config::File::from(found).required(false));
            }
        }
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("PAPER_SCRAPER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut config: Config = settings.try_deserialize()?;
    config.apply_legacy_env();
    Ok(config)
}

/// Get the configuration from the default locations, falling back to
/// built-in defaults if it cannot be loaded.
pub fn get_config() -> Config {
    load_config(None).unwrap_or_else(|e| {
        tracing::warn!("{}, using defaults", e);
        Config::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.harvest.limit, 10);
        assert_eq!(config.harvest.page_size, 100);
        assert_eq!(config.harvest.batch_size, 10);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.doi.resolver_base, "https://doi.org");
        assert_eq!(config.downloads.directory, PathBuf::from("."));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let toml_content = r#"
[api_keys]
semantic_scholar = "test-key"

[doi]
fallback_base = "https://mirror.example"

[downloads]
directory = "/tmp/papers"

[harvest]
limit = 25
page_size = 50
"#;

        let mut file = File::create(&path).unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.api_keys.semantic_scholar, Some("test-key".to_string()));
        assert_eq!(config.doi.fallback_base.as_deref(), Some("https://mirror.example"));
        assert_eq!(config.doi.resolver_base, "https://doi.org");
        assert_eq!(config.downloads.directory, PathBuf::from("/tmp/papers"));
        assert_eq!(config.harvest.limit, 25);
        assert_eq!(config.harvest.page_size, 50);
        assert_eq!(config.harvest.batch_size, 10);
    }

    #[test]
    fn test_environment_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[http]\ntimeout_secs = 5\n").unwrap();

        std::env::set_var("PAPER_SCRAPER_HTTP__CONNECT_TIMEOUT_SECS", "3");
        let config = load_config(Some(&path));
        std::env::remove_var("PAPER_SCRAPER_HTTP__CONNECT_TIMEOUT_SECS");

        let config = config.unwrap();
        assert_eq!(config.http.timeout_secs, 5);
        assert_eq!(config.http.connect_timeout_secs, 3);
    }

    #[test]
    fn test_config_file_nonexistent() {
        let result = load_config(Some(Path::new("/nonexistent/config.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_file_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");

        std::fs::write(&path, "invalid = toml = content").unwrap();

        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let mut config = Config::default();
        config.harvest.batch_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.harvest.page_size = 0;
        assert!(config.validate().is_err());

        config.harvest.page_size = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_to_toml_masks_key() {
        let mut config = Config::default();
        config.api_keys.semantic_scholar = Some("secret".to_string());

        let rendered = config.to_toml().unwrap();
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[harvest]"));
        assert!(rendered.contains("page_size = 100"));
    }
}
