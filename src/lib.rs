pub mod config;
pub mod download;
pub mod input;
pub mod scrape;

// Re-export commonly used types for easier access in tests
pub use config::ConfigManager;
pub use download::{
    BatchObserver, BatchSummary, CallbackObserver, DownloadEngine, DownloadError,
    DownloadManager, DownloadResult, DownloadTask, DownloaderConfig,
};
pub use scrape::{
    Destination, Extractor, FetchError, MetadataFetcher, MetadataSource, PresentationMetadata,
    RegexExtractor, ResourceIdParser,
};
