//! Course-Kraken main entry point
//!
//! This is the command-line interface for the Course-Kraken portal harvester.

use anyhow::Context;
use clap::Parser;
use course_kraken::config::{load_config_with_hash, Config};
use course_kraken::crawler::crawl;
use course_kraken::output::print_statistics;
use course_kraken::{Credentials, Session};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Course-Kraken: harvests course files from an authenticated portal
///
/// Course-Kraken logs into the portal, lists your courses, filters them by
/// name and downloads every file it finds on the remaining course pages into
/// a course/block directory tree.
#[derive(Parser, Debug)]
#[command(name = "course-kraken")]
#[command(version)]
#[command(about = "Harvests course files from an authenticated portal", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without logging in
    #[arg(long)]
    dry_run: bool,

    /// Credentials file (overrides [auth] credentials-file)
    #[arg(long, value_name = "FILE")]
    credentials: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    handle_crawl(config, cli.credentials).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("course_kraken=info,warn"),
            1 => EnvFilter::new("course_kraken=debug,info"),
            2 => EnvFilter::new("course_kraken=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Course-Kraken Dry Run ===\n");

    println!("Portal:");
    println!("  Root: {}", config.root_url()?);
    println!("  Login: {}", config.login_url()?);
    println!("  First listing request: {}", config.courses_page_url(0)?);

    println!("\nCrawler Configuration:");
    println!("  Workers: {}", config.crawler.threads);
    println!("  Request timeout: {}s", config.crawler.timeout_secs);
    println!("  Attempts per page: {}", config.crawler.retries);
    println!("  Idle timeout: {}s", config.crawler.idle_timeout_secs);
    println!(
        "  Page fetches: {}",
        if config.crawler.render_pages {
            "rendered (headless browser)"
        } else {
            "static"
        }
    );

    println!("\nDownloads:");
    println!("  Directory: {}", config.download.directory.display());
    println!("  Max file size: {} MB", config.download.max_file_size_mb);

    println!("\nCourse Filters ({}):", config.filters.len());
    for entry in &config.filters {
        let mode = if entry.include { "include" } else { "exclude" };
        println!("  - {} /{}/", mode, entry.pattern);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Credentials would be read from {}", config.auth.credentials_file.display());

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, credentials_file: Option<PathBuf>) -> anyhow::Result<()> {
    let credentials_file = credentials_file.unwrap_or_else(|| config.auth.credentials_file.clone());
    let credentials = Credentials::from_env_file(&credentials_file)?;

    let session = Session::new(config.request_timeout())?;
    session
        .login(&config.login_url()?, &credentials)
        .await
        .context("Cannot establish an authenticated session")?;

    match crawl(config, session).await {
        Ok(stats) => {
            tracing::info!("Crawl completed successfully");
            println!();
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
