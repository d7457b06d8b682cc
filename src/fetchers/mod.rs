pub mod browser;
pub mod direct;

use crate::config::FetchStrategyConfig;
use crate::error::Result;
use crate::results::{FetchResult, FetchedPage};
use crate::utils::now_epoch_millis;
use std::future::Future;

pub use browser::BrowserFetcher;
pub use direct::DirectFetcher;

/// Marker in a search URL template that receives the encoded query
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// What to fetch: a literal URL, or a free-text query for the search engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Url(String),
    Query(String),
}

impl Target {
    /// Request URL for this target.
    ///
    /// Queries are percent-encoded into `{query}` of `template`; URLs pass through.
    pub fn resolve(&self, template: &str) -> String {
        match self {
            Target::Url(url) => url.clone(),
            Target::Query(query) => template.replace(QUERY_PLACEHOLDER, &urlencoding::encode(query)),
        }
    }

    /// Human-readable form, used to name snapshot slots
    pub fn label(&self) -> &str {
        match self {
            Target::Url(s) | Target::Query(s) => s,
        }
    }
}

/// Something that turns a URL into rendered HTML.
///
/// Implementations make exactly one attempt; retries belong to callers.
/// The returned page names the URL it was finally served from.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage>> + Send;
}

/// The fetch strategy picked by configuration
#[derive(Debug, Clone)]
pub enum Fetcher {
    DirectRequest(DirectFetcher),
    BrowserSession(BrowserFetcher),
}

impl Fetcher {
    pub fn from_config(config: &FetchStrategyConfig) -> Result<Self> {
        match config {
            FetchStrategyConfig::Direct(direct) => {
                Ok(Self::DirectRequest(DirectFetcher::new(direct)?))
            }
            FetchStrategyConfig::Browser(browser) => {
                Ok(Self::BrowserSession(BrowserFetcher::new(browser.clone())))
            }
        }
    }
}

impl PageFetcher for Fetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        match self {
            Fetcher::DirectRequest(fetcher) => fetcher.fetch(url).await,
            Fetcher::BrowserSession(fetcher) => fetcher.fetch(url).await,
        }
    }
}

/// Fetches `url` and stamps the result with its source and capture time
pub async fn fetch_result<F: PageFetcher>(fetcher: &F, url: &str) -> Result<FetchResult> {
    let page = fetcher.fetch(url).await?;
    if page.final_url != url {
        ::log::debug!("{} was served from {}", url, page.final_url);
    }
    Ok(FetchResult {
        source_url: url.to_string(),
        final_url: page.final_url,
        html: page.html,
        fetched_at_epoch_millis: now_epoch_millis(),
    })
}
