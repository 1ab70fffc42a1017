//! Headless Chrome page renderer
//!
//! Only available with the `browser` feature. The browser is launched on the
//! first render and kept until [`PageRenderer::close`].

use crate::config::BrowserConfig as RendererConfig;
use crate::crawler::fetcher::{FetchError, PageRenderer};
use anyhow::Context;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

const CHROME_PATHS: &[&str] = &[
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

struct Running {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// [`PageRenderer`] backed by a single headless Chrome instance
pub struct ChromeRenderer {
    config: RendererConfig,
    timeout: Duration,
    running: Option<Running>,
}

impl ChromeRenderer {
    pub fn new(config: RendererConfig, timeout: Duration) -> Self {
        Self {
            config,
            timeout,
            running: None,
        }
    }

    fn executable(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.config.executable {
            return Ok(path.clone());
        }
        CHROME_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
            .context("Chrome/Chromium not found; set [browser] executable")
    }

    async fn ensure_browser(&mut self) -> anyhow::Result<&Browser> {
        if self.running.is_none() {
            let executable = self.executable()?;
            tracing::info!(
                "Launching browser {} (headless={})",
                executable.display(),
                self.config.headless
            );

            let mut builder = BrowserConfig::builder()
                .chrome_executable(executable)
                .request_timeout(self.timeout)
                .arg("--disable-dev-shm-usage")
                .arg("--no-first-run")
                .arg("--no-sandbox")
                .arg("--disable-gpu");
            if !self.config.headless {
                builder = builder.with_head();
            }
            let config = builder
                .build()
                .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .context("Failed to launch browser")?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            self.running = Some(Running { browser, handler });
        }

        self.running
            .as_ref()
            .map(|running| &running.browser)
            .context("browser not running")
    }

    async fn render_page(&mut self, url: &Url, cookies: &[(String, String)]) -> anyhow::Result<String> {
        let params = cookies
            .iter()
            .map(|(name, value)| {
                CookieParam::builder()
                    .name(name.as_str())
                    .value(value.as_str())
                    .url(url.as_str())
                    .build()
                    .map_err(|e| anyhow::anyhow!("Failed to build cookie {}: {}", name, e))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let browser = self.ensure_browser().await?;
        let page = browser.new_page("about:blank").await.context("Failed to open page")?;

        let result = async {
            if !params.is_empty() {
                page.set_cookies(params).await.context("Failed to set cookies")?;
            }
            page.goto(url.as_str()).await.context("Navigation failed")?;
            page.wait_for_navigation().await.context("Page did not settle")?;
            page.content().await.context("Failed to read page content")
        }
        .await;

        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close page for {}: {}", url, e);
        }
        result
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&mut self, url: &Url, cookies: &[(String, String)]) -> Result<String, FetchError> {
        self.render_page(url, cookies)
            .await
            .map_err(|e| FetchError::Render {
                url: url.to_string(),
                message: format!("{:#}", e),
            })
    }

    async fn close(&mut self) {
        if let Some(mut running) = self.running.take() {
            if let Err(e) = running.browser.close().await {
                tracing::warn!("Failed to close browser: {}", e);
            }
            let _ = running.browser.wait().await;
            running.handler.abort();
            tracing::info!("Browser closed");
        }
    }
}
