//! Crawler module for portal traversal and file harvesting
//!
//! This module contains the core crawling logic, including:
//! - The deduplicating frontier of typed targets
//! - Page fetching with retries (static or browser-rendered)
//! - Course listing through the portal's JSON endpoint
//! - File downloads with size gating
//! - Overall crawl coordination

mod coordinator;
mod courses;
mod downloader;
mod fetcher;
mod frontier;
#[cfg(feature = "browser")]
mod render;
mod target;

pub use coordinator::Crawler;
pub use courses::list_courses;
pub use downloader::{destination, Downloader, SaveOutcome, DEFAULT_EXTENSION};
pub use fetcher::{
    FetchError, FetchOutcome, FetchStrategy, Fetcher, PageRenderer, RenderedStrategy,
    StaticStrategy,
};
pub use frontier::{Frontier, VisitedSet};
#[cfg(feature = "browser")]
pub use render::ChromeRenderer;
pub use target::Target;

use crate::config::Config;
use crate::output::{CrawlStatistics, CrawlStats};
use crate::session::Session;
use crate::KrakenError;
use std::sync::Arc;

/// Runs a complete crawl over an authenticated session
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the crawler and its fetch strategy from the configuration
/// 2. Seed the frontier with the root target
/// 3. Drain the frontier with the configured number of workers
/// 4. Return the run's statistics
///
/// The session must already be logged in.
pub async fn crawl(config: Config, session: Session) -> Result<CrawlStatistics, KrakenError> {
    let stats = Arc::new(CrawlStats::new());
    let crawler = Crawler::new(config, session, stats)?;
    Ok(crawler.run().await)
}
