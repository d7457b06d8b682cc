use super::PageFetcher;
use crate::config::BrowserFetchConfig;
use crate::error::{HarvestError, Result};
use crate::results::FetchedPage;
use fantoccini::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::time::{Duration, Instant, sleep, timeout};

/// Reports document readiness and how many subresources have finished loading
const IDLE_PROBE: &str = r#"
    return {
        ready: document.readyState,
        resources: performance.getEntriesByType('resource').length
    };
"#;

/// Tried in order when the configured WebDriver cannot be reached
const FALLBACK_WEBDRIVER_URLS: &[&str] = &[
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4444", // Selenium / geckodriver default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

/// Renders pages in a fresh WebDriver session per fetch.
///
/// Needed for result pages that fill in their content from script after
/// the initial document arrives.
#[derive(Debug, Clone)]
pub struct BrowserFetcher {
    config: BrowserFetchConfig,
}

impl BrowserFetcher {
    pub fn new(config: BrowserFetchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrowserFetchConfig {
        &self.config
    }
}

impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        ::log::info!("Rendering {} via WebDriver", url);
        let started = std::time::Instant::now();

        let client = connect_to_webdriver(&self.config, url).await?;

        // The session is closed below on success, error and timeout alike.
        // A panic drops the last client handle, which also ends the session.
        let limit = Duration::from_secs(self.config.navigation_timeout_secs);
        let rendered = match timeout(limit, render(&client, url, &self.config)).await {
            Ok(result) => result,
            Err(_) => Err(HarvestError::navigation(
                url,
                format!("page did not settle within {} seconds", limit.as_secs()),
            )),
        };

        close_session(client, url).await;

        let page = rendered?;
        ::log::debug!(
            "Rendered {} bytes from {} in {:.2} seconds",
            page.html.len(),
            page.final_url,
            started.elapsed().as_secs_f64()
        );
        Ok(page)
    }
}

/// Navigates, waits for the network to go quiet, then serializes the DOM
async fn render(client: &Client, url: &str, config: &BrowserFetchConfig) -> Result<FetchedPage> {
    client
        .goto(url)
        .await
        .map_err(|e| navigation_error(e, "accessing", url))?;

    wait_for_network_idle(client, url, config).await?;

    let html = client
        .source()
        .await
        .map_err(|e| navigation_error(e, "getting source for", url))?;
    let final_url = client
        .current_url()
        .await
        .map_err(|e| navigation_error(e, "reading final address of", url))?;
    Ok(FetchedPage::new(final_url.as_str(), html))
}

async fn wait_for_network_idle(
    client: &Client,
    url: &str,
    config: &BrowserFetchConfig,
) -> Result<()> {
    let mut tracker = IdleTracker::new(Duration::from_millis(config.idle_settle_ms));
    let poll = Duration::from_millis(config.poll_interval_ms.max(10));

    loop {
        let value = client
            .execute(IDLE_PROBE, Vec::new())
            .await
            .map_err(|e| navigation_error(e, "probing network activity on", url))?;
        let probe: IdleProbe = serde_json::from_value(value)
            .map_err(|e| HarvestError::navigation(url, format!("unexpected idle probe: {e}")))?;

        if tracker.observe(&probe, Instant::now()) {
            ::log::debug!(
                "Network idle on {} after {} resources",
                url,
                probe.resources
            );
            return Ok(());
        }
        sleep(poll).await;
    }
}

/// One reading of [`IDLE_PROBE`]
#[derive(Debug, Clone, Deserialize)]
struct IdleProbe {
    ready: String,
    resources: u64,
}

/// Decides when a page has been quiet for long enough.
///
/// Resource timing entries appear as loads finish, so a document that is
/// `complete` with an unchanged entry count for the whole settle window has
/// no connections left completing.
#[derive(Debug)]
struct IdleTracker {
    settle: Duration,
    last_count: Option<u64>,
    quiet_since: Option<Instant>,
}

impl IdleTracker {
    fn new(settle: Duration) -> Self {
        Self {
            settle,
            last_count: None,
            quiet_since: None,
        }
    }

    fn observe(&mut self, probe: &IdleProbe, now: Instant) -> bool {
        if probe.ready != "complete" {
            self.last_count = None;
            self.quiet_since = None;
            return false;
        }

        if self.last_count != Some(probe.resources) {
            self.last_count = Some(probe.resources);
            self.quiet_since = Some(now);
            return self.settle.is_zero();
        }

        self.quiet_since
            .is_some_and(|since| now.duration_since(since) >= self.settle)
    }
}

/// Browser capabilities for an isolated, optionally headless session
fn capabilities(config: &BrowserFetchConfig) -> Map<String, Value> {
    let mut chrome_args = vec!["--disable-gpu", "--no-sandbox", "--disable-dev-shm-usage"];
    let mut firefox_args = Vec::new();
    if config.headless {
        chrome_args.push("--headless=new");
        firefox_args.push("-headless");
    }

    let caps = json!({
        "goog:chromeOptions": { "args": chrome_args },
        "moz:firefoxOptions": { "args": firefox_args },
    });
    match caps {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Connects to the WebDriver instance, falling back to well-known local endpoints
async fn connect_to_webdriver(config: &BrowserFetchConfig, url: &str) -> Result<Client> {
    let caps = capabilities(config);
    let mut last_error = String::new();

    let fallbacks: &[&str] = if config.fallback_endpoints {
        FALLBACK_WEBDRIVER_URLS
    } else {
        &[]
    };
    let candidates = std::iter::once(config.webdriver_url.as_str()).chain(
        fallbacks
            .iter()
            .copied()
            .filter(|fallback| *fallback != config.webdriver_url),
    );

    for (attempt, webdriver_url) in candidates.enumerate() {
        if attempt > 0 {
            ::log::info!("Trying fallback WebDriver URL: {}", webdriver_url);
        }

        let mut builder = ClientBuilder::native();
        builder.capabilities(caps.clone());
        match builder.connect(webdriver_url).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", webdriver_url);
                return Ok(client);
            }
            Err(e) => {
                if attempt == 0 {
                    ::log::error!(
                        "Failed to connect to WebDriver at {}: {}",
                        webdriver_url,
                        e
                    );
                }
                last_error = e.to_string();
            }
        }
    }

    ::log::error!(
        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
    );
    Err(HarvestError::navigation(
        url,
        format!("could not open a browser session: {last_error}"),
    ))
}

async fn close_session(client: Client, url: &str) {
    if let Err(e) = client.close().await {
        ::log::warn!("Failed to close browser session for {}: {}", url, e);
    } else {
        ::log::trace!("Closed browser session for {}", url);
    }
}

/// Handles errors that occur during navigation or page source retrieval
fn navigation_error(error: fantoccini::error::CmdError, context: &str, url: &str) -> HarvestError {
    if error.to_string().contains("Unable to find session") {
        ::log::warn!("Lost session while {} {}", context, url);
    } else {
        ::log::error!("Failed {} {}: {}", context, url, error);
    }
    HarvestError::navigation(url, format!("failed {context} page: {error}"))
}
