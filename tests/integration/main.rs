//! Integration tests against wiremock portals
//!
//! Each module starts its own mock server; files land in tempfile directories.

mod crawl_tests;
mod download_tests;
mod fetch_tests;

use course_kraken::config::{
    AuthConfig, BrowserConfig, Config, CrawlerConfig, DownloadConfig, FilterEntry, PortalConfig,
};
use std::path::Path;

/// A configuration pointing at a mock portal rooted at `server_uri`
pub fn create_test_config(server_uri: &str, download_dir: &Path, filters: Vec<FilterEntry>) -> Config {
    Config {
        portal: PortalConfig {
            root_url: format!("{}/my/", server_uri),
            login_url: Some("/login/index.php".to_string()),
            courses_endpoint: "/courses?page=".to_string(),
            courses_endpoint_suffix: "&view=grid".to_string(),
        },
        crawler: CrawlerConfig {
            threads: 4,
            timeout_secs: 5,
            retries: 2,
            idle_timeout_secs: 3,
            render_pages: false,
        },
        download: DownloadConfig {
            directory: download_dir.to_path_buf(),
            max_file_size_mb: 200.0,
        },
        auth: AuthConfig::default(),
        browser: BrowserConfig::default(),
        filters,
    }
}

/// JSON body of one course-listing page
pub fn listing_body(courses: &[(&str, &str)], pagination: Option<&str>) -> String {
    let courses: Vec<serde_json::Value> = courses
        .iter()
        .map(|(url, name)| {
            serde_json::json!({
                "courseurl": url,
                "coursename": format!("<a class=\"coursename\" href=\"{}\">{}</a>", url, name),
            })
        })
        .collect();

    match pagination {
        Some(fragment) => serde_json::json!({ "courses": courses, "pagination": fragment }),
        None => serde_json::json!({ "courses": courses }),
    }
    .to_string()
}
