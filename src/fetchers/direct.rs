use super::PageFetcher;
use crate::config::DirectFetchConfig;
use crate::error::{HarvestError, Result};
use crate::results::FetchedPage;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, HeaderMap, HeaderValue, REFERER};
use std::time::{Duration, Instant};

/// Single HTTP GET with desktop-browser headers.
///
/// Enough for pages that ship their content in the initial document.
#[derive(Debug, Clone)]
pub struct DirectFetcher {
    client: Client,
}

impl DirectFetcher {
    pub fn new(config: &DirectFetchConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(browser_headers(config)?);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| HarvestError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl PageFetcher for DirectFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        ::log::info!("GET {}", url);
        let started = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HarvestError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            ::log::warn!("GET {} returned {}", url, status);
            return Err(HarvestError::network(
                url,
                format!("server responded with status {status}"),
            ));
        }

        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| HarvestError::from_reqwest(url, e))?;

        ::log::debug!(
            "Fetched {} bytes from {} in {:.2} seconds",
            body.len(),
            url,
            started.elapsed().as_secs_f64()
        );
        Ok(FetchedPage::new(final_url, body))
    }
}

fn browser_headers(config: &DirectFetchConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let optional = [
        (ACCEPT, config.accept.as_deref()),
        (ACCEPT_LANGUAGE, config.accept_language.as_deref()),
        (REFERER, config.referer.as_deref()),
        (CONNECTION, config.keep_alive.then_some("keep-alive")),
    ];

    for (name, value) in optional {
        if let Some(value) = value {
            let value = HeaderValue::from_str(value).map_err(|e| {
                HarvestError::Config(format!("invalid value for header {name}: {e}"))
            })?;
            headers.insert(name, value);
        }
    }

    Ok(headers)
}
