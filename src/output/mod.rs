//! Output module for crawl summaries
//!
//! This module handles recording crawl statistics while the crawl runs and
//! printing the end-of-run summary.

pub mod stats;

pub use stats::{print_statistics, CrawlStatistics, CrawlStats};
