//! Page fetching
//!
//! This module retrieves portal pages for the crawler:
//! - A static strategy over the session's no-redirect client
//! - A rendered strategy that hands pages to a headless browser
//! - A retry loop shared by both
//!
//! # Outcomes
//!
//! | Response | Outcome |
//! |----------|---------|
//! | 2xx | `Content(body)` |
//! | 303 with `Location` | `Redirect(location)` |
//! | Any other status | `Failed`, not retried |
//! | Transport error / timeout | retried, then `Failed` |

use crate::output::CrawlStats;
use crate::session::Session;
use async_trait::async_trait;
use reqwest::{header::LOCATION, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use url::Url;

/// Result of fetching one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page markup
    Content(String),

    /// The page redirected explicitly; carries the raw `Location` value
    Redirect(String),

    /// Nothing usable came back
    Failed,
}

/// Failure of a single fetch attempt; the only kind of failure that is retried
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("render error for {url}: {message}")]
    Render { url: String, message: String },
}

/// One way of turning a URL into a [`FetchOutcome`]
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Makes one attempt; errors are retried by [`Fetcher`]
    async fn attempt(&self, url: &Url) -> Result<FetchOutcome, FetchError>;

    /// Releases held resources once the crawl is over
    async fn shutdown(&self) {}

    fn name(&self) -> &'static str;
}

/// Plain HTTP GET without following redirects
pub struct StaticStrategy {
    session: Session,
}

impl StaticStrategy {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl FetchStrategy for StaticStrategy {
    async fn attempt(&self, url: &Url) -> Result<FetchOutcome, FetchError> {
        let response = self
            .session
            .no_redirect_client()
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();

        if status == StatusCode::SEE_OTHER {
            if let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
            {
                tracing::debug!("{} redirects to {}", url, location);
                return Ok(FetchOutcome::Redirect(location.to_string()));
            }
        }

        if !status.is_success() {
            tracing::warn!("HTTP {} for {}", status.as_u16(), url);
            return Ok(FetchOutcome::Failed);
        }

        let body = response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        Ok(FetchOutcome::Content(body))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Something that can load a page in a browser and return its final markup
#[async_trait]
pub trait PageRenderer: Send {
    /// Loads `url` with the given cookies set and returns the rendered markup
    async fn render(&mut self, url: &Url, cookies: &[(String, String)]) -> Result<String, FetchError>;

    /// Shuts the browser down; later renders may start a new one
    async fn close(&mut self);
}

/// Fetches pages through a [`PageRenderer`]
///
/// The renderer is not safe for concurrent use, so renders are serialized.
pub struct RenderedStrategy {
    renderer: Mutex<Box<dyn PageRenderer>>,
    session: Session,
}

impl RenderedStrategy {
    pub fn new(renderer: Box<dyn PageRenderer>, session: Session) -> Self {
        Self {
            renderer: Mutex::new(renderer),
            session,
        }
    }
}

#[async_trait]
impl FetchStrategy for RenderedStrategy {
    async fn attempt(&self, url: &Url) -> Result<FetchOutcome, FetchError> {
        let cookies = self.session.cookies_for(url);
        let mut renderer = self.renderer.lock().await;
        let markup = renderer.render(url, &cookies).await?;
        Ok(FetchOutcome::Content(markup))
    }

    async fn shutdown(&self) {
        self.renderer.lock().await.close().await;
    }

    fn name(&self) -> &'static str {
        "rendered"
    }
}

/// Retrying front end over a [`FetchStrategy`]
#[derive(Clone)]
pub struct Fetcher {
    strategy: Arc<dyn FetchStrategy>,
    retries: u32,
    retry_delay: Duration,
    stats: Arc<CrawlStats>,
}

impl Fetcher {
    /// `retries` is the total number of attempts; at least one is made
    pub fn new(strategy: Arc<dyn FetchStrategy>, retries: u32, stats: Arc<CrawlStats>) -> Self {
        Self {
            strategy,
            retries: retries.max(1),
            retry_delay: Duration::from_millis(500),
            stats,
        }
    }

    /// Base pause between attempts, multiplied by the attempt number
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Fetches a page, retrying transport failures
    ///
    /// Never errors: after the last failed attempt the outcome is `Failed`.
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        for attempt in 1..=self.retries {
            self.stats.record_fetch_attempt();

            match self.strategy.attempt(url).await {
                Ok(FetchOutcome::Failed) => {
                    self.stats.record_fetch_failure();
                    return FetchOutcome::Failed;
                }
                Ok(outcome) => return outcome,
                Err(e) => {
                    tracing::debug!(
                        "Attempt {}/{} ({}) failed: {}",
                        attempt,
                        self.retries,
                        self.strategy.name(),
                        e
                    );
                    if attempt < self.retries && !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                }
            }
        }

        tracing::warn!("Giving up on {} after {} attempts", url, self.retries);
        self.stats.record_fetch_failure();
        FetchOutcome::Failed
    }

    pub async fn shutdown(&self) {
        self.strategy.shutdown().await;
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }
}
