//! Crawl coordination
//!
//! [`Crawler::run`] is the dispatch loop: it claims targets from the frontier,
//! hands each to a worker task and stops once the frontier is drained and no
//! worker is left, or when the frontier stays empty for the idle timeout with
//! no worker running. Worker failures are logged and counted; they never end
//! the loop.
//!
//! # Target handling
//!
//! | Target | Work |
//! |--------|------|
//! | Root | List courses, filter by name, queue kept courses |
//! | CoursePage | Fetch, extract block links (or tile-view courses), queue them |
//! | FilePage | Resolve the file (direct, redirect or parsed), download it |

use crate::config::Config;
use crate::crawler::courses::list_courses;
use crate::crawler::downloader::Downloader;
use crate::crawler::fetcher::{FetchOutcome, FetchStrategy, Fetcher, StaticStrategy};
use crate::crawler::frontier::Frontier;
use crate::crawler::Target;
use crate::filter::CourseFilter;
use crate::output::{CrawlStatistics, CrawlStats};
use crate::parser::{
    descriptor_from_redirect, direct_file, extract_file_descriptor, extract_links, CoursePage,
    FileDescriptor,
};
use crate::session::Session;
use crate::url::{resolve_href, same_origin};
use crate::KrakenError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;
use url::Url;

/// State shared by the dispatch loop and every worker
struct Shared {
    config: Config,
    root: Url,
    session: Session,
    fetcher: Fetcher,
    downloader: Downloader,
    frontier: Frontier,
    filter: CourseFilter,
    stats: Arc<CrawlStats>,
}

/// Main crawler structure
pub struct Crawler {
    shared: Arc<Shared>,
    threads: usize,
    idle_timeout: Duration,
}

impl Crawler {
    /// Creates a crawler with the fetch strategy selected by the configuration
    ///
    /// # Errors
    ///
    /// Invalid root URL or filter patterns, or `render-pages = true` in a build
    /// without the `browser` feature.
    pub fn new(config: Config, session: Session, stats: Arc<CrawlStats>) -> Result<Self, KrakenError> {
        let strategy = page_strategy(&config, &session)?;
        Self::with_strategy(config, session, strategy, stats)
    }

    /// Creates a crawler that fetches pages through `strategy`
    pub fn with_strategy(
        config: Config,
        session: Session,
        strategy: Arc<dyn FetchStrategy>,
        stats: Arc<CrawlStats>,
    ) -> Result<Self, KrakenError> {
        let root = config.root_url()?;
        let filter = CourseFilter::from_entries(&config.filters)?;
        let fetcher = Fetcher::new(strategy, config.crawler.retries, Arc::clone(&stats));
        let downloader = Downloader::new(session.clone(), &config.download, Arc::clone(&stats));

        let threads = config.crawler.threads.max(1);
        let idle_timeout = config.idle_timeout();

        tracing::info!(
            "Crawler ready: {} workers, {} page fetches, {} filter rules",
            threads,
            fetcher.strategy_name(),
            filter.len()
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                root,
                session,
                fetcher,
                downloader,
                frontier: Frontier::new(),
                filter,
                stats,
            }),
            threads,
            idle_timeout,
        })
    }

    pub fn frontier(&self) -> &Frontier {
        &self.shared.frontier
    }

    pub fn stats(&self) -> &Arc<CrawlStats> {
        &self.shared.stats
    }

    /// Runs the crawl from the root target until the frontier drains
    pub async fn run(&self) -> CrawlStatistics {
        let started_at = chrono::Utc::now();
        let span = tracing::info_span!("crawl", root = %self.shared.root);
        tracing::info!(parent: &span, "Starting crawl");

        self.shared
            .frontier
            .offer(Target::root(self.shared.root.clone()));

        let permits = Arc::new(Semaphore::new(self.threads));
        let mut workers: JoinSet<()> = JoinSet::new();

        loop {
            if self.shared.frontier.is_empty() && workers.is_empty() {
                tracing::info!(parent: &span, "Frontier is empty, crawl complete");
                break;
            }

            // The idle clock only runs while no handler is in flight
            let idle = workers.is_empty().then_some(self.idle_timeout);

            tokio::select! {
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    self.settle(joined);
                }
                next = self.shared.frontier.take_within(idle), if permits.available_permits() > 0 => {
                    let Some(target) = next else {
                        tracing::warn!(
                            parent: &span,
                            "No new targets for {:?}, shutting down",
                            self.idle_timeout
                        );
                        break;
                    };

                    let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                        break;
                    };
                    let shared = Arc::clone(&self.shared);
                    workers.spawn(
                        async move {
                            let _permit = permit;
                            shared.handle(target).await;
                        }
                        .instrument(span.clone()),
                    );
                }
                else => break,
            }
        }

        while let Some(joined) = workers.join_next().await {
            self.settle(joined);
        }

        let left = self.shared.frontier.len();
        if left > 0 {
            tracing::warn!(parent: &span, "{} targets left unvisited", left);
        }

        self.shared.fetcher.shutdown().await;

        let finished_at = chrono::Utc::now();
        tracing::info!(
            parent: &span,
            "Crawl finished: {} distinct URLs queued in {}s",
            self.shared.frontier.queued_total(),
            (finished_at - started_at).num_seconds()
        );

        self.shared.stats.snapshot(started_at, finished_at)
    }

    fn settle(&self, joined: Result<(), tokio::task::JoinError>) {
        if let Err(e) = joined {
            tracing::error!("Worker aborted: {}", e);
            self.shared.stats.record_handler_failure();
        }
    }
}

impl Shared {
    /// Processes one target; errors end here
    async fn handle(&self, target: Target) {
        self.stats.record_visit();
        let description = target.to_string();
        tracing::debug!("Handling {}", description);

        let result = match target {
            Target::Root { url } => self.handle_root(&url).await,
            Target::CoursePage { url } => self.handle_course(&url).await,
            Target::FilePage {
                url,
                display_name,
                block_name,
                course_name,
            } => {
                self.handle_file(&url, &display_name, &block_name, &course_name)
                    .await
            }
        };

        if let Err(e) = result {
            tracing::error!("Failed to handle {}: {}", description, e);
            self.stats.record_handler_failure();
        }
    }

    async fn handle_root(&self, url: &Url) -> Result<(), KrakenError> {
        let courses = list_courses(&self.session, &self.config).await?;

        let kept: Vec<_> = courses
            .iter()
            .filter(|course| {
                let keep = self.filter.keep(&course.name);
                if !keep {
                    tracing::debug!("Filtered out course '{}'", course.name);
                }
                keep
            })
            .collect();

        self.stats.record_listing(courses.len(), kept.len());
        tracing::info!(
            "Keeping {} of {} courses ({} filtered)",
            kept.len(),
            courses.len(),
            courses.len() - kept.len()
        );

        for course in kept {
            match resolve_href(url, &course.url) {
                Some(course_url) => {
                    self.frontier.offer(Target::course(course_url));
                }
                None => tracing::warn!("Unusable URL '{}' for course '{}'", course.url, course.name),
            }
        }

        Ok(())
    }

    async fn handle_course(&self, url: &Url) -> Result<(), KrakenError> {
        let html = match self.fetcher.fetch(url).await {
            FetchOutcome::Content(html) => html,
            FetchOutcome::Redirect(location) => {
                tracing::warn!("Course page {} redirected to {}, skipping", url, location);
                return Ok(());
            }
            FetchOutcome::Failed => return Ok(()),
        };

        match extract_links(&html, url)? {
            CoursePage::Tiles {
                course_name,
                courses,
            } => {
                tracing::info!("'{}' is a tile view with {} courses", course_name, courses.len());
                for course_url in courses {
                    self.frontier.offer(Target::course(course_url));
                }
            }
            CoursePage::Blocks {
                course_name,
                links,
                untitled_blocks,
                denied_links,
            } => {
                tracing::info!(
                    "'{}': {} links ({} denied, {} untitled blocks skipped)",
                    course_name,
                    links.len(),
                    denied_links,
                    untitled_blocks
                );
                for link in links {
                    self.stats.record_file_link();
                    self.frontier.offer(Target::FilePage {
                        url: link.url,
                        display_name: link.display_name,
                        block_name: link.block_name,
                        course_name: course_name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    async fn handle_file(
        &self,
        url: &Url,
        display_name: &str,
        block_name: &str,
        course_name: &str,
    ) -> Result<(), KrakenError> {
        if !same_origin(url, &self.root) {
            tracing::debug!("Skipping '{}': {} is off the portal", display_name, url);
            self.stats.record_foreign();
            return Ok(());
        }

        let Some(descriptor) = self.resolve_file(url).await? else {
            return Ok(());
        };

        let file_url = url.join(&descriptor.url)?;
        if !same_origin(&file_url, &self.root) {
            tracing::debug!("Skipping '{}': file {} is off the portal", display_name, file_url);
            self.stats.record_foreign();
            return Ok(());
        }

        tracing::debug!("'{}' resolves to {} at {}", display_name, descriptor.name, file_url);
        self.downloader
            .save(&file_url, &descriptor.name, course_name, block_name)
            .await;
        Ok(())
    }

    /// Finds the file behind a resource link; None when there is nothing to download
    async fn resolve_file(&self, url: &Url) -> Result<Option<FileDescriptor>, KrakenError> {
        if let Some(descriptor) = direct_file(url) {
            return Ok(Some(descriptor));
        }

        let descriptor = match self.fetcher.fetch(url).await {
            FetchOutcome::Content(html) => extract_file_descriptor(&html, url),
            FetchOutcome::Redirect(location) => {
                self.stats.record_redirect();
                descriptor_from_redirect(&url.join(&location)?)
            }
            FetchOutcome::Failed => return Ok(None),
        };

        if descriptor.is_none() {
            tracing::warn!("No download found on {}", url);
            self.stats.record_parse_miss();
        }
        Ok(descriptor)
    }
}

/// Picks the page fetch strategy for the configuration
#[cfg(feature = "browser")]
fn page_strategy(config: &Config, session: &Session) -> Result<Arc<dyn FetchStrategy>, KrakenError> {
    use crate::crawler::fetcher::RenderedStrategy;
    use crate::crawler::render::ChromeRenderer;

    if config.crawler.render_pages {
        let renderer = ChromeRenderer::new(config.browser.clone(), config.request_timeout());
        return Ok(Arc::new(RenderedStrategy::new(
            Box::new(renderer),
            session.clone(),
        )));
    }
    Ok(Arc::new(StaticStrategy::new(session.clone())))
}

/// Picks the page fetch strategy for the configuration
#[cfg(not(feature = "browser"))]
fn page_strategy(config: &Config, session: &Session) -> Result<Arc<dyn FetchStrategy>, KrakenError> {
    if config.crawler.render_pages {
        return Err(KrakenError::Browser(
            "render-pages requires a build with the `browser` feature".to_string(),
        ));
    }
    Ok(Arc::new(StaticStrategy::new(session.clone())))
}
