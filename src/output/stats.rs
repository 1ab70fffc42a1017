//! Crawl statistics
//!
//! Components record into a shared [`CrawlStats`] while the crawl runs; at the
//! end a [`CrawlStatistics`] snapshot is taken and printed.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by the crawler, fetcher and downloader
#[derive(Debug, Default)]
pub struct CrawlStats {
    targets_visited: AtomicU64,
    courses_listed: AtomicU64,
    courses_kept: AtomicU64,
    file_links: AtomicU64,
    fetch_attempts: AtomicU64,
    fetch_failures: AtomicU64,
    redirects: AtomicU64,
    parse_misses: AtomicU64,
    files_saved: AtomicU64,
    bytes_written: AtomicU64,
    skipped_too_large: AtomicU64,
    skipped_foreign: AtomicU64,
    save_failures: AtomicU64,
    handler_failures: AtomicU64,
}

macro_rules! counters {
    ($($record:ident => $field:ident),* $(,)?) => {
        impl CrawlStats {
            $(
                pub fn $record(&self) {
                    self.$field.fetch_add(1, Ordering::Relaxed);
                }
            )*
        }
    };
}

counters! {
    record_visit => targets_visited,
    record_file_link => file_links,
    record_fetch_attempt => fetch_attempts,
    record_fetch_failure => fetch_failures,
    record_redirect => redirects,
    record_parse_miss => parse_misses,
    record_too_large => skipped_too_large,
    record_foreign => skipped_foreign,
    record_save_failure => save_failures,
    record_handler_failure => handler_failures,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_listing(&self, listed: usize, kept: usize) {
        self.courses_listed.fetch_add(listed as u64, Ordering::Relaxed);
        self.courses_kept.fetch_add(kept as u64, Ordering::Relaxed);
    }

    pub fn record_saved(&self, bytes: u64) {
        self.files_saved.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of the counters
    pub fn snapshot(&self, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> CrawlStatistics {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        CrawlStatistics {
            started_at,
            finished_at,
            targets_visited: load(&self.targets_visited),
            courses_listed: load(&self.courses_listed),
            courses_kept: load(&self.courses_kept),
            file_links: load(&self.file_links),
            fetch_attempts: load(&self.fetch_attempts),
            fetch_failures: load(&self.fetch_failures),
            redirects: load(&self.redirects),
            parse_misses: load(&self.parse_misses),
            files_saved: load(&self.files_saved),
            bytes_written: load(&self.bytes_written),
            skipped_too_large: load(&self.skipped_too_large),
            skipped_foreign: load(&self.skipped_foreign),
            save_failures: load(&self.save_failures),
            handler_failures: load(&self.handler_failures),
        }
    }
}

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Targets claimed from the frontier
    pub targets_visited: u64,

    /// Courses returned by the listing endpoint
    pub courses_listed: u64,

    /// Courses that passed the filter
    pub courses_kept: u64,

    /// File links found on course pages
    pub file_links: u64,

    /// Page fetch attempts, retries included
    pub fetch_attempts: u64,

    /// Pages given up on after all attempts
    pub fetch_failures: u64,

    /// Resource pages that redirected straight to a file
    pub redirects: u64,

    /// Resource pages without a recognizable download
    pub parse_misses: u64,

    pub files_saved: u64,
    pub bytes_written: u64,

    /// Files over the size cap
    pub skipped_too_large: u64,

    /// Links leaving the portal origin
    pub skipped_foreign: u64,

    pub save_failures: u64,

    /// Targets whose handler failed
    pub handler_failures: u64,
}

impl CrawlStatistics {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// Files skipped for any reason other than a failed save
    pub fn files_skipped(&self) -> u64 {
        self.skipped_too_large + self.skipped_foreign + self.parse_misses
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Run:");
    println!("  Started:  {}", stats.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Finished: {}", stats.finished_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Duration: {}s", stats.duration_seconds());
    println!();

    println!("Overview:");
    println!("  Targets visited: {}", stats.targets_visited);
    println!(
        "  Courses: {} listed, {} kept after filtering",
        stats.courses_listed, stats.courses_kept
    );
    println!("  File links found: {}", stats.file_links);
    println!();

    println!("Fetching:");
    println!("  Attempts: {}", stats.fetch_attempts);
    println!("  Failed pages: {}", stats.fetch_failures);
    println!("  Direct redirects: {}", stats.redirects);
    println!();

    println!("Files:");
    println!(
        "  Saved: {} ({:.1} MB)",
        stats.files_saved,
        stats.bytes_written as f64 / 1_000_000.0
    );
    println!("  Skipped: {}", stats.files_skipped());
    if stats.files_skipped() > 0 {
        println!("    over size cap: {}", stats.skipped_too_large);
        println!("    foreign origin: {}", stats.skipped_foreign);
        println!("    no download found: {}", stats.parse_misses);
    }
    println!("  Save failures: {}", stats.save_failures);

    if stats.handler_failures > 0 {
        println!();
        println!("Handler failures: {}", stats.handler_failures);
    }
}
