//! Scraping side of the pipeline: resolving a presentation id from a source
//! URL, fetching its metadata document and pulling the title and video link
//! out of it, then turning those into a place on disk.

pub mod extractor;
pub mod fetcher;
pub mod paths;
pub mod resource;

pub use extractor::{Extractor, PresentationMetadata, RegexExtractor};
pub use fetcher::{FetchError, MetadataFetcher, MetadataSource};
pub use paths::{Destination, course_name, derive_destination, sanitize_path_component};
pub use resource::ResourceIdParser;
