use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error for rid {rid}: request timed out after {}s", .timeout.as_secs())]
    Timeout { rid: String, timeout: Duration },

    #[error("Network error for rid {rid}: {source}")]
    Request {
        rid: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Network error for rid {rid}: server responded with {status}")]
    Status { rid: String, status: StatusCode },
}

/// Source of raw presentation metadata, keyed by resource id.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// URL the metadata for `rid` is served from. Relative video links in the
    /// response are resolved against it.
    fn metadata_url(&self, rid: &str) -> String;

    async fn fetch(&self, rid: &str) -> Result<String, FetchError>;
}

/// Fetches the presentation player document over HTTP. One request per call,
/// no retries.
#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl MetadataFetcher {
    pub fn new(client: Client, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        }
    }

    fn classify(&self, rid: &str, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                rid: rid.to_string(),
                timeout: self.timeout,
            }
        } else {
            FetchError::Request {
                rid: rid.to_string(),
                source: error,
            }
        }
    }
}

#[async_trait]
impl MetadataSource for MetadataFetcher {
    fn metadata_url(&self, rid: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), rid)
    }

    async fn fetch(&self, rid: &str) -> Result<String, FetchError> {
        let url = self.metadata_url(rid);
        debug!("Fetching presentation metadata from {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(rid, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                rid: rid.to_string(),
                status,
            });
        }

        response.text().await.map_err(|e| self.classify(rid, e))
    }
}
