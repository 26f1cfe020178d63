//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Upstream content API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Fetch pacing, retry, and cache behavior
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Extraction pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Console logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if url::Url::parse(&self.api.endpoint).is_err() {
            return Err(AppError::validation("api.endpoint is not a valid URL"));
        }
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        if self.crawler.max_retries == 0 {
            return Err(AppError::validation("crawler.max_retries must be > 0"));
        }
        if self.crawler.cache_flush_every == 0 {
            return Err(AppError::validation(
                "crawler.cache_flush_every must be > 0",
            ));
        }
        if self.pipeline.max_depth == 0 {
            return Err(AppError::validation("pipeline.max_depth must be > 0"));
        }
        if self.pipeline.root_name.trim().is_empty() {
            return Err(AppError::validation("pipeline.root_name is empty"));
        }
        if self.pipeline.anchor_pages.is_empty() {
            return Err(AppError::validation("No anchor pages defined"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            crawler: CrawlerConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

/// Upstream content API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// MediaWiki API endpoint
    #[serde(default = "defaults::endpoint")]
    pub endpoint: String,

    /// User-Agent header for API requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::endpoint(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Fetch pacing, retry, and cache behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum interval between physical API requests in milliseconds
    #[serde(default = "defaults::min_interval")]
    pub min_interval_ms: u64,

    /// Maximum physical attempts per request
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Linear backoff unit for 5xx/timeout retries in milliseconds
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Sleep applied on HTTP 429 when no Retry-After header is given
    #[serde(default = "defaults::retry_after_default")]
    pub retry_after_default_secs: u64,

    /// Flush the page cache to disk every N stored responses
    #[serde(default = "defaults::cache_flush_every")]
    pub cache_flush_every: usize,

    /// Cap on collected map-image candidates per page
    #[serde(default = "defaults::max_image_candidates")]
    pub max_image_candidates: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: defaults::min_interval(),
            max_retries: defaults::max_retries(),
            retry_backoff_ms: defaults::retry_backoff(),
            retry_after_default_secs: defaults::retry_after_default(),
            cache_flush_every: defaults::cache_flush_every(),
            max_image_candidates: defaults::max_image_candidates(),
        }
    }
}

/// Extraction pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the synthetic root node
    #[serde(default = "defaults::root_name")]
    pub root_name: String,

    /// Top-level pages the extraction starts from
    #[serde(default = "defaults::anchor_pages")]
    pub anchor_pages: Vec<String>,

    /// Maximum recursion depth below an anchor page
    #[serde(default = "defaults::max_depth")]
    pub max_depth: usize,

    /// Seconds a finished run stays visible to status polling
    #[serde(default = "defaults::run_retention")]
    pub run_retention_secs: u64,

    /// Source type reported to the import collaborator
    #[serde(default = "defaults::source_type")]
    pub source_type: String,

    /// Source attribution reported to the import collaborator
    #[serde(default = "defaults::source")]
    pub source: String,

    /// Human-readable description of the imported hierarchy
    #[serde(default = "defaults::description")]
    pub description: String,

    /// Display name of the imported hierarchy
    #[serde(default = "defaults::display_name")]
    pub display_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root_name: defaults::root_name(),
            anchor_pages: defaults::anchor_pages(),
            max_depth: defaults::max_depth(),
            run_retention_secs: defaults::run_retention(),
            source_type: defaults::source_type(),
            source: defaults::source(),
            description: defaults::description(),
            display_name: defaults::display_name(),
        }
    }
}

/// Console logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level: debug, info, warn, error
    #[serde(default = "defaults::log_level")]
    pub level: String,

    /// Whether to narrate per-page progress
    #[serde(default = "defaults::show_progress")]
    pub show_progress: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            show_progress: defaults::show_progress(),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for the on-disk page cache
    #[serde(default = "defaults::cache_dir")]
    pub cache_dir: String,

    /// Directory for exported hierarchies
    #[serde(default = "defaults::output_dir")]
    pub output_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: defaults::cache_dir(),
            output_dir: defaults::output_dir(),
        }
    }
}

mod defaults {
    // API defaults
    pub fn endpoint() -> String {
        "https://en.wikivoyage.org/w/api.php".into()
    }
    pub fn user_agent() -> String {
        "region-crawler/0.1 (travel region hierarchy extractor)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Crawler defaults
    pub fn min_interval() -> u64 {
        350
    }
    pub fn max_retries() -> u32 {
        5
    }
    pub fn retry_backoff() -> u64 {
        1000
    }
    pub fn retry_after_default() -> u64 {
        5
    }
    pub fn cache_flush_every() -> usize {
        25
    }
    pub fn max_image_candidates() -> usize {
        15
    }

    // Pipeline defaults
    pub fn root_name() -> String {
        "World".into()
    }
    pub fn anchor_pages() -> Vec<String> {
        vec![
            "Africa".into(),
            "Asia".into(),
            "Europe".into(),
            "North America".into(),
            "South America".into(),
            "Oceania".into(),
            "Antarctica".into(),
        ]
    }
    pub fn max_depth() -> usize {
        8
    }
    pub fn run_retention() -> u64 {
        300
    }
    pub fn source_type() -> String {
        "wikivoyage".into()
    }
    pub fn source() -> String {
        "en.wikivoyage.org".into()
    }
    pub fn description() -> String {
        "Region hierarchy extracted from Wikivoyage".into()
    }
    pub fn display_name() -> String {
        "Wikivoyage world hierarchy".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
    pub fn show_progress() -> bool {
        true
    }

    // Path defaults
    pub fn cache_dir() -> String {
        "data/cache".into()
    }
    pub fn output_dir() -> String {
        "data/output".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.api.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_endpoint() {
        let mut config = Config::default();
        config.api.endpoint = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_depth() {
        let mut config = Config::default();
        config.pipeline.max_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_anchors() {
        let mut config = Config::default();
        config.pipeline.anchor_pages.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.api.endpoint, config.api.endpoint);
        assert_eq!(back.pipeline.anchor_pages.len(), 7);
    }
}
