use super::DownloadResult;

/// Aggregate outcome of a batch, handed to [`BatchObserver::on_batch_complete`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// In completion order, not submission order.
    pub results: Vec<DownloadResult>,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            results: Vec::with_capacity(total),
            ..Default::default()
        }
    }

    pub fn record(&mut self, result: DownloadResult) {
        if result.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    pub fn completed(&self) -> usize {
        self.results.len()
    }

    pub fn is_complete(&self) -> bool {
        self.completed() == self.total
    }

    pub fn total_bytes(&self) -> u64 {
        self.results.iter().map(|r| r.bytes_downloaded).sum()
    }
}

/// Subscriber for batch progress. Callbacks run on the task driving the
/// batch, one at a time.
pub trait BatchObserver: Send + Sync {
    /// Called once per finished task; `completed` counts up from 1.
    fn on_task_complete(&self, completed: usize, result: &DownloadResult);

    fn on_batch_complete(&self, _summary: &BatchSummary) {}
}

/// Adapts a progress closure and a completion closure into a [`BatchObserver`].
pub struct CallbackObserver<P, C> {
    on_progress: P,
    on_finished: C,
}

impl<P, C> CallbackObserver<P, C>
where
    P: Fn(usize, &DownloadResult) + Send + Sync,
    C: Fn(&BatchSummary) + Send + Sync,
{
    pub fn new(on_progress: P, on_finished: C) -> Self {
        Self {
            on_progress,
            on_finished,
        }
    }
}

impl<P, C> BatchObserver for CallbackObserver<P, C>
where
    P: Fn(usize, &DownloadResult) + Send + Sync,
    C: Fn(&BatchSummary) + Send + Sync,
{
    fn on_task_complete(&self, completed: usize, result: &DownloadResult) {
        (self.on_progress)(completed, result)
    }

    fn on_batch_complete(&self, summary: &BatchSummary) {
        (self.on_finished)(summary)
    }
}

pub struct NoopObserver;

impl BatchObserver for NoopObserver {
    fn on_task_complete(&self, _completed: usize, _result: &DownloadResult) {}
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_summary_counts() {
        let mut summary = BatchSummary::new(3);
        summary.record(DownloadResult::failed("a", "Invalid URL format: a"));
        assert!(!summary.is_complete());

        let mut ok = DownloadResult::failed("b", "");
        ok.success = true;
        ok.bytes_downloaded = 2048;
        summary.record(ok);
        summary.record(DownloadResult::failed("c", "MP4 video not found for URL: c"));

        assert!(summary.is_complete());
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.total_bytes(), 2048);
    }

    #[test]
    fn test_callback_observer_forwards() {
        let seen = Mutex::new(Vec::new());
        let finished = Mutex::new(None);

        let observer = CallbackObserver::new(
            |n, r: &DownloadResult| seen.lock().unwrap().push((n, r.url.clone())),
            |s: &BatchSummary| *finished.lock().unwrap() = Some(s.total),
        );

        observer.on_task_complete(1, &DownloadResult::failed("x", "boom"));
        observer.on_batch_complete(&BatchSummary::new(1));

        assert_eq!(*seen.lock().unwrap(), vec![(1, "x".to_string())]);
        assert_eq!(*finished.lock().unwrap(), Some(1));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(250 * 1024 * 1024), "250.0 MB");
    }
}
