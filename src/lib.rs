//! Course-Kraken: a course portal file harvester
//!
//! This crate crawls an authenticated course portal organized as a tree
//! (landing page, course pages, resource pages), discovers downloadable files
//! in a filtered subset of courses and stores them under a local directory tree.

pub mod config;
pub mod crawler;
pub mod filter;
pub mod output;
pub mod parser;
pub mod session;
pub mod url;

use thiserror::Error;

/// Main error type for Course-Kraken operations
#[derive(Debug, Error)]
pub enum KrakenError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("Course listing error: {0}")]
    Listing(String),

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid filter pattern: {0}")]
    InvalidPattern(String),
}

/// Result type alias for Course-Kraken operations
pub type Result<T> = std::result::Result<T, KrakenError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, Target};
pub use filter::{CourseFilter, FilterRule};
pub use session::{Credentials, Session};
pub use url::{resolve_href, same_origin, slugify};
