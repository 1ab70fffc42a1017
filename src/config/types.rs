use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Course-Kraken
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub portal: PortalConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub download: DownloadConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default, rename = "filter")]
    pub filters: Vec<FilterEntry>,
}

/// Location of the portal and its course-listing endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    /// Landing page; seeds the crawl and defines the same-origin boundary
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// Login form page (defaults to the root URL)
    #[serde(rename = "login-url", default)]
    pub login_url: Option<String>,

    /// Course-listing endpoint up to the page index
    #[serde(rename = "courses-endpoint")]
    pub courses_endpoint: String,

    /// Course-listing endpoint after the page index
    #[serde(rename = "courses-endpoint-suffix", default)]
    pub courses_endpoint_suffix: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of targets handled concurrently
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout")]
    pub timeout_secs: u64,

    /// Attempts per page fetch before giving up
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// How long the dispatch loop waits on an empty frontier (seconds)
    #[serde(rename = "idle-timeout-secs", default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Fetch pages through a headless browser instead of plain requests
    #[serde(rename = "render-pages", default)]
    pub render_pages: bool,
}

/// Output location and size policy
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    pub directory: PathBuf,

    #[serde(rename = "max-file-size-mb", default = "default_max_file_size")]
    pub max_file_size_mb: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "credentials-file", default = "default_credentials_file")]
    pub credentials_file: PathBuf,
}

/// Headless browser settings for the rendered fetch strategy
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub executable: Option<PathBuf>,

    #[serde(default = "default_headless")]
    pub headless: bool,
}

/// One course-name rule; all rules must agree for a course to be kept
#[derive(Debug, Clone, Deserialize)]
pub struct FilterEntry {
    /// Regular expression searched in the course name
    pub pattern: String,

    /// Keep the course when the pattern matches (true) or when it does not (false)
    pub include: bool,
}

fn default_threads() -> usize {
    12
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    4
}

fn default_idle_timeout() -> u64 {
    15
}

fn default_max_file_size() -> f64 {
    200.0
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("credentials.env")
}

fn default_headless() -> bool {
    true
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            timeout_secs: default_timeout(),
            retries: default_retries(),
            idle_timeout_secs: default_idle_timeout(),
            render_pages: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_file: default_credentials_file(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: default_headless(),
        }
    }
}
