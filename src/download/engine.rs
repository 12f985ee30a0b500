use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::{Client, StatusCode, Url};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{CHUNK_SIZE, DownloaderConfig};
use crate::scrape::{
    Destination, Extractor, FetchError, MetadataFetcher, MetadataSource, RegexExtractor,
    ResourceIdParser, derive_destination,
};

/// Why a single download failed. Never escapes a task: it is folded into a
/// failed [`DownloadResult`].
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Metadata(#[from] FetchError),

    #[error("MP4 video not found for URL: {0}")]
    VideoNotFound(String),

    #[error("Download failed for {file_name}: invalid video URL {url}: {reason}")]
    InvalidVideoUrl {
        file_name: String,
        url: String,
        reason: String,
    },

    #[error("Download failed for {file_name}: could not create {}: {source}", .path.display())]
    CreateDir {
        file_name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Download failed for {file_name}: {source}")]
    Transfer {
        file_name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Download failed for {file_name}: server responded with {status}")]
    Status {
        file_name: String,
        status: StatusCode,
    },

    #[error("Download failed for {file_name}: timed out after {}s", .timeout.as_secs())]
    TimedOut {
        file_name: String,
        timeout: Duration,
    },

    #[error("Download failed for {file_name}: {source}")]
    Write {
        file_name: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub url: String,
    pub output_dir: PathBuf,
}

impl DownloadTask {
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
        }
    }
}

/// Outcome of one task, reported exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub url: String,
    pub success: bool,
    pub message: String,
    pub saved_path: Option<PathBuf>,
    pub bytes_downloaded: u64,
}

impl DownloadResult {
    pub fn succeeded(
        url: &str,
        destination: &Destination,
        saved_path: PathBuf,
        bytes: u64,
    ) -> Self {
        Self {
            url: url.to_string(),
            success: true,
            message: format!("Downloaded: {}", destination.relative_path()),
            saved_path: Some(saved_path),
            bytes_downloaded: bytes,
        }
    }

    pub fn failed(url: &str, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            success: false,
            message: message.into(),
            saved_path: None,
            bytes_downloaded: 0,
        }
    }
}

/// Runs the single-item pipeline: rid → metadata → title/video → path →
/// streamed file.
pub struct DownloadEngine {
    client: Client,
    config: Arc<DownloaderConfig>,
    resource_ids: ResourceIdParser,
    metadata: Arc<dyn MetadataSource>,
    extractor: Arc<dyn Extractor>,
}

impl DownloadEngine {
    pub fn new(config: DownloaderConfig) -> Result<Self> {
        Url::parse(&config.metadata_endpoint).with_context(|| {
            format!("Invalid metadata endpoint: {}", config.metadata_endpoint)
        })?;

        let client = Client::builder()
            .default_headers(config.default_headers()?)
            .build()
            .context("Failed to create HTTP client")?;

        let metadata = MetadataFetcher::new(
            client.clone(),
            config.metadata_endpoint.clone(),
            config.metadata_timeout,
        );

        Ok(Self {
            client,
            config: Arc::new(config),
            resource_ids: ResourceIdParser::new()?,
            metadata: Arc::new(metadata),
            extractor: Arc::new(RegexExtractor::new()?),
        })
    }

    pub fn with_metadata_source(mut self, source: Arc<dyn MetadataSource>) -> Self {
        self.metadata = source;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    pub async fn download(&self, task: &DownloadTask) -> DownloadResult {
        let start_time = Instant::now();
        debug!("Starting download for {}", task.url);

        match self.run_pipeline(task).await {
            Ok((destination, saved_path, bytes)) => {
                info!(
                    "Downloaded {} ({} bytes) in {:.1}s",
                    destination.relative_path(),
                    bytes,
                    start_time.elapsed().as_secs_f64()
                );
                DownloadResult::succeeded(&task.url, &destination, saved_path, bytes)
            }
            Err(e) => {
                warn!("{}", e);
                DownloadResult::failed(&task.url, e.to_string())
            }
        }
    }

    /// Convenience wrapper for a one-off download.
    pub async fn download_video(&self, url: &str, base_dir: &Path) -> DownloadResult {
        self.download(&DownloadTask::new(url, base_dir)).await
    }

    async fn run_pipeline(
        &self,
        task: &DownloadTask,
    ) -> Result<(Destination, PathBuf, u64), DownloadError> {
        let rid = self
            .resource_ids
            .parse(&task.url)
            .ok_or_else(|| DownloadError::InvalidUrl(task.url.clone()))?;

        let raw = self.metadata.fetch(rid).await?;
        let metadata = self.extractor.extract(&raw);

        let video = metadata
            .video_url
            .ok_or_else(|| DownloadError::VideoNotFound(task.url.clone()))?;

        let destination = derive_destination(metadata.title.as_deref(), &video);
        let video_url = self.resolve_video_url(rid, &video, &destination)?;

        let directory = destination.directory(&task.output_dir);
        fs::create_dir_all(&directory)
            .await
            .map_err(|source| DownloadError::CreateDir {
                file_name: destination.file_name.clone(),
                path: directory.clone(),
                source,
            })?;

        let saved_path = destination.file_path(&task.output_dir);
        let bytes = self
            .stream_to_file(video_url, &saved_path, &destination.file_name)
            .await?;

        Ok((destination, saved_path, bytes))
    }

    /// Video links may be relative to the metadata document.
    fn resolve_video_url(
        &self,
        rid: &str,
        video: &str,
        destination: &Destination,
    ) -> Result<Url, DownloadError> {
        let invalid = |reason: String| DownloadError::InvalidVideoUrl {
            file_name: destination.file_name.clone(),
            url: video.to_string(),
            reason,
        };

        match Url::parse(video) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = Url::parse(&self.metadata.metadata_url(rid))
                    .map_err(|e| invalid(e.to_string()))?;
                base.join(video).map_err(|e| invalid(e.to_string()))
            }
            Err(e) => Err(invalid(e.to_string())),
        }
    }

    async fn stream_to_file(
        &self,
        url: Url,
        path: &Path,
        file_name: &str,
    ) -> Result<u64, DownloadError> {
        let limit = self.config.download_timeout;
        let timed_out = || DownloadError::TimedOut {
            file_name: file_name.to_string(),
            timeout: limit,
        };
        let transfer = |source: reqwest::Error| DownloadError::Transfer {
            file_name: file_name.to_string(),
            source,
        };
        let write = |source: io::Error| DownloadError::Write {
            file_name: file_name.to_string(),
            source,
        };

        debug!("Streaming {} to {}", url, path.display());

        let response = timeout(limit, self.client.get(url).send())
            .await
            .map_err(|_| timed_out())?
            .map_err(transfer)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                file_name: file_name.to_string(),
                status,
            });
        }

        let file = File::create(path).await.map_err(write)?;
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        // Timeout applies to each read, not the whole transfer.
        while let Some(chunk) = timeout(limit, stream.next())
            .await
            .map_err(|_| timed_out())?
        {
            let chunk = chunk.map_err(transfer)?;
            writer.write_all(&chunk).await.map_err(write)?;
            downloaded += chunk.len() as u64;
        }

        writer.flush().await.map_err(write)?;
        Ok(downloaded)
    }
}
