//! Search-results harvesting: fetch a results page (plain HTTP or a rendered
//! browser session), snapshot it, and pull out result links and email addresses.

pub mod config;
pub mod error;
pub mod fetchers;
pub mod filter;
pub mod parsers;
pub mod pipeline;
pub mod results;
pub mod snapshot;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::HarvestConfig;
pub use error::{HarvestError, Result};
pub use fetchers::{Fetcher, PageFetcher, Target};
pub use parsers::{SelectorPolicy, extract_emails, extract_links};
pub use pipeline::{Harvester, Mode};
pub use results::{EmailSet, FetchResult, FetchedPage, HtmlDocument, LinkRecord, PipelineResult};
pub use snapshot::SnapshotStore;
