pub mod engine;
pub mod manager;
pub mod progress;

pub use engine::{DownloadEngine, DownloadError, DownloadResult, DownloadTask};
pub use manager::DownloadManager;
pub use progress::{BatchObserver, BatchSummary, CallbackObserver, NoopObserver};

use anyhow::{Context, Result};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

pub const DEFAULT_METADATA_ENDPOINT: &str =
    "https://delos.uoa.gr/opendelos/services/presentationplayer";
pub const DEFAULT_REFERER: &str = "https://delos.uoa.gr/opendelos/player";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36 OPR/107.0.0.0";
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Read buffer size used when streaming a video to disk.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Immutable settings shared by every task of a batch.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    pub metadata_endpoint: String,
    pub user_agent: String,
    pub referer: String,
    pub metadata_timeout: Duration,
    pub download_timeout: Duration,
    pub max_concurrent: usize,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            metadata_endpoint: DEFAULT_METADATA_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            metadata_timeout: Duration::from_secs(15),
            download_timeout: Duration::from_secs(60),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl DownloaderConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.metadata_endpoint = endpoint.into();
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_timeouts(mut self, metadata: Duration, download: Duration) -> Self {
        self.metadata_timeout = metadata;
        self.download_timeout = download;
        self
    }

    /// Headers the player sends with its XHR. The origin answers
    /// `406 Not Acceptable` when `Accept` is missing.
    pub fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/xml, text/xml, */*; q=0.01"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(
            header::REFERER,
            HeaderValue::from_str(&self.referer).context("Invalid Referer header value")?,
        );
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&self.user_agent).context("Invalid User-Agent header value")?,
        );

        let fixed = [
            ("sec-fetch-dest", "empty"),
            ("sec-fetch-mode", "cors"),
            ("sec-fetch-site", "same-origin"),
            ("x-requested-with", "XMLHttpRequest"),
            (
                "sec-ch-ua",
                r#""Not A(Brand";v="99", "Opera GX";v="107", "Chromium";v="121""#,
            ),
            ("sec-ch-ua-mobile", "?0"),
            ("sec-ch-ua-platform", r#""Windows""#),
        ];
        for (name, value) in fixed {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }

        Ok(headers)
    }
}
