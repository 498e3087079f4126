// src/models/config.rs

//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Request pacing and retry settings
    #[serde(default)]
    pub pacing: PacingConfig,
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
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::config("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::config("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_pages == 0 {
            return Err(AppError::config("crawler.max_pages must be > 0"));
        }
        if self.crawler.stall_limit == 0 {
            return Err(AppError::config("crawler.stall_limit must be > 0"));
        }
        if self.pacing.requests_per_second == 0 {
            return Err(AppError::config("pacing.requests_per_second must be > 0"));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Hard ceiling on pages fetched per request
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// Consecutive no-progress pages tolerated before aborting a crawl
    #[serde(default = "defaults::stall_limit")]
    pub stall_limit: u32,

    /// Default post cap for thread crawls
    #[serde(default = "defaults::default_cap")]
    pub default_cap: usize,

    /// Default entry count for board listings
    #[serde(default = "defaults::default_topk")]
    pub default_topk: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_pages: defaults::max_pages(),
            stall_limit: defaults::stall_limit(),
            default_cap: defaults::default_cap(),
            default_topk: defaults::default_topk(),
        }
    }
}

/// Request pacing and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Steady request rate shared by all concurrent requests
    #[serde(default = "defaults::requests_per_second")]
    pub requests_per_second: u32,

    /// Retry attempts per page fetch beyond the first try
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential retry backoff, in milliseconds
    #[serde(default = "defaults::base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            requests_per_second: defaults::requests_per_second(),
            max_retries: defaults::max_retries(),
            base_delay_ms: defaults::base_delay_ms(),
        }
    }
}

mod defaults {
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/123.0 Safari/537.36"
            .to_string()
    }

    pub fn timeout() -> u64 {
        30
    }

    pub fn max_pages() -> u32 {
        30
    }

    pub fn stall_limit() -> u32 {
        3
    }

    pub fn default_cap() -> usize {
        50
    }

    pub fn default_topk() -> usize {
        30
    }

    pub fn requests_per_second() -> u32 {
        2
    }

    pub fn max_retries() -> u32 {
        3
    }

    pub fn base_delay_ms() -> u64 {
        1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_stall_limit() {
        let mut config = Config::default();
        config.crawler.stall_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [pacing]
            requests_per_second = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.pacing.requests_per_second, 5);
        assert_eq!(config.crawler.stall_limit, 3);
    }
}
