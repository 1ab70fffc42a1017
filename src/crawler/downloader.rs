//! File persistence
//!
//! # Save flow
//!
//! 1. HEAD for `Content-Length` (missing or unreadable counts as 1 byte)
//! 2. Skip when the size exceeds the cap
//! 3. GET the body, streamed into `<name>.part` and abandoned once it grows
//!    past the cap
//! 4. Rename to `<root>/<slug(course)>/<slug(block)>/<normalized name>`,
//!    appending `.zip` when the name has no extension
//!
//! Nothing here returns an error to the caller; failures are logged and
//! reported as [`SaveOutcome::Failed`].

use crate::config::DownloadConfig;
use crate::output::CrawlStats;
use crate::session::Session;
use crate::url::{file_extension, normalize_file_name, slugify};
use crate::KrakenError;
use futures::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use reqwest::Response;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use url::Url;

/// Extension given to files whose name has none (folder archives)
pub const DEFAULT_EXTENSION: &str = "zip";

const BYTES_PER_MB: f64 = 1_000_000.0;

/// What happened to one file
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    TooLarge { bytes: u64 },
    Failed,
}

/// Result of streaming one body to disk
enum Streamed {
    Complete(u64),
    OverCap(u64),
}

/// Writes files into the download tree
#[derive(Clone)]
pub struct Downloader {
    session: Session,
    root: PathBuf,
    max_file_size_mb: f64,
    stats: Arc<CrawlStats>,
}

impl Downloader {
    pub fn new(session: Session, config: &DownloadConfig, stats: Arc<CrawlStats>) -> Self {
        Self {
            session,
            root: config.directory.clone(),
            max_file_size_mb: config.max_file_size_mb,
            stats,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Downloads one file; never fails the caller
    pub async fn save(
        &self,
        file_url: &Url,
        file_name: &str,
        course_name: &str,
        block_name: &str,
    ) -> SaveOutcome {
        match self.try_save(file_url, file_name, course_name, block_name).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Failed to save {}: {}", file_url, e);
                self.stats.record_save_failure();
                SaveOutcome::Failed
            }
        }
    }

    async fn try_save(
        &self,
        file_url: &Url,
        file_name: &str,
        course_name: &str,
        block_name: &str,
    ) -> Result<SaveOutcome, KrakenError> {
        let bytes = self.content_length(file_url).await;
        if exceeds_cap(bytes, self.max_file_size_mb) {
            tracing::info!(
                "Skipping {} ({:.1} MB over the {} MB cap)",
                file_url,
                bytes as f64 / BYTES_PER_MB,
                self.max_file_size_mb
            );
            self.stats.record_too_large();
            return Ok(SaveOutcome::TooLarge { bytes });
        }

        let response = self
            .session
            .client()
            .get(file_url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| KrakenError::Http {
                url: file_url.to_string(),
                source,
            })?;

        let destination = destination(&self.root, course_name, block_name, file_name);
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let part = partial_path(&destination);
        let streamed = match self.stream_body(response, &part, file_url).await {
            Ok(streamed) => streamed,
            Err(e) => {
                tokio::fs::remove_file(&part).await.ok();
                return Err(e);
            }
        };

        match streamed {
            Streamed::Complete(written) => {
                if let Err(e) = tokio::fs::rename(&part, &destination).await {
                    tokio::fs::remove_file(&part).await.ok();
                    return Err(e.into());
                }
                tracing::info!("Saved {} ({} bytes)", destination.display(), written);
                self.stats.record_saved(written);
                Ok(SaveOutcome::Saved(destination))
            }
            Streamed::OverCap(written) => {
                tokio::fs::remove_file(&part).await.ok();
                tracing::info!(
                    "Abandoned {} after {} bytes, over the {} MB cap",
                    file_url,
                    written,
                    self.max_file_size_mb
                );
                self.stats.record_too_large();
                Ok(SaveOutcome::TooLarge { bytes: written })
            }
        }
    }

    /// Copies the body into `part`, stopping as soon as it exceeds the cap
    async fn stream_body(
        &self,
        response: Response,
        part: &Path,
        file_url: &Url,
    ) -> Result<Streamed, KrakenError> {
        let mut file = tokio::fs::File::create(part).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| KrakenError::Http {
                url: file_url.to_string(),
                source,
            })?;

            written += chunk.len() as u64;
            if exceeds_cap(written, self.max_file_size_mb) {
                return Ok(Streamed::OverCap(written));
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(Streamed::Complete(written))
    }

    /// Size announced by a HEAD request; 1 when unknown
    async fn content_length(&self, file_url: &Url) -> u64 {
        let response = match self.session.client().head(file_url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("HEAD failed for {}: {}", file_url, e);
                return 1;
            }
        };

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(1)
    }
}

fn exceeds_cap(bytes: u64, max_file_size_mb: f64) -> bool {
    bytes as f64 / BYTES_PER_MB > max_file_size_mb
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// Final on-disk path of a file
pub fn destination(root: &Path, course_name: &str, block_name: &str, file_name: &str) -> PathBuf {
    let mut name = normalize_file_name(file_name);
    if file_extension(&name).is_none() {
        name.push('.');
        name.push_str(DEFAULT_EXTENSION);
    }
    root.join(slugify(course_name)).join(slugify(block_name)).join(name)
}
