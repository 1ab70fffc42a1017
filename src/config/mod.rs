//! Configuration module for Course-Kraken
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use course_kraken::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("kraken.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.threads);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AuthConfig, BrowserConfig, Config, CrawlerConfig, DownloadConfig, FilterEntry, PortalConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

use crate::ConfigError;
use std::time::Duration;
use url::Url;

impl Config {
    /// The parsed root URL; validated at load time
    pub fn root_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.portal.root_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("root-url: {}", e)))
    }

    /// Login page, resolved against the root URL
    pub fn login_url(&self) -> Result<Url, ConfigError> {
        let root = self.root_url()?;
        match &self.portal.login_url {
            Some(login) => root
                .join(login)
                .map_err(|e| ConfigError::InvalidUrl(format!("login-url: {}", e))),
            None => Ok(root),
        }
    }

    /// Course-listing request for one page index
    pub fn courses_page_url(&self, index: usize) -> Result<Url, ConfigError> {
        let raw = format!(
            "{}{}{}",
            self.portal.courses_endpoint, index, self.portal.courses_endpoint_suffix
        );
        self.root_url()?
            .join(&raw)
            .map_err(|e| ConfigError::InvalidUrl(format!("courses-endpoint: {}", e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.crawler.timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.crawler.idle_timeout_secs)
    }
}
