use anyhow::Result;
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use super::{
    BatchObserver, BatchSummary, DownloadEngine, DownloadResult, DownloadTask, DownloaderConfig,
};

/// Fans a batch of URLs out over a fixed number of concurrent downloads.
pub struct DownloadManager {
    engine: Arc<DownloadEngine>,
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl DownloadManager {
    pub fn new(config: DownloaderConfig) -> Result<Self> {
        Ok(Self::from_engine(DownloadEngine::new(config)?))
    }

    pub fn from_engine(engine: DownloadEngine) -> Self {
        let max_concurrent = engine.config().max_concurrent.max(1);
        Self {
            engine: Arc::new(engine),
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Downloads every URL into `base_dir`. Each URL yields exactly one
    /// result, reported to `observer` as soon as it finishes; a failing URL
    /// never affects the others.
    pub async fn run_batch<O>(
        &self,
        urls: Vec<String>,
        base_dir: &Path,
        observer: &O,
    ) -> BatchSummary
    where
        O: BatchObserver + ?Sized,
    {
        let mut summary = BatchSummary::new(urls.len());
        info!(
            "Starting batch of {} download(s), {} at a time",
            urls.len(),
            self.max_concurrent
        );

        let mut pending = FuturesUnordered::new();
        for url in urls {
            let engine = Arc::clone(&self.engine);
            let semaphore = Arc::clone(&self.semaphore);
            let task = DownloadTask::new(url.clone(), base_dir);

            let handle = tokio::spawn(async move {
                // Fails only after close(), which is never called.
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return DownloadResult::failed(&task.url, "Download pool closed"),
                };
                engine.download(&task).await
            });

            pending.push(async move { (url, handle.await) });
        }

        while let Some((url, joined)) = pending.next().await {
            let result = joined.unwrap_or_else(|e| {
                error!("Download task for {} aborted: {}", url, e);
                DownloadResult::failed(&url, format!("Download task aborted for {}: {}", url, e))
            });

            summary.record(result);
            let completed = summary.completed();
            if let Some(result) = summary.results.last() {
                debug!("[{}/{}] {}", completed, summary.total, result.message);
                observer.on_task_complete(completed, result);
            }
        }

        info!(
            "Batch finished: {} succeeded, {} failed",
            summary.succeeded, summary.failed
        );
        observer.on_batch_complete(&summary);
        summary
    }
}
