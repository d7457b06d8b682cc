use crate::error::{HarvestError, Result};
use crate::filter::ResultFilterConfig;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Desktop browser identity sent by the direct-request strategy
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Top-level configuration handed to the harvester at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Search URL with a `{query}` placeholder for the percent-encoded query
    #[serde(default = "default_search_url_template")]
    pub search_url_template: String,

    /// CSS selector for result anchors on the search results page
    #[serde(default = "default_result_selector")]
    pub result_selector: String,

    /// CSS selector for anchors harvested from snapshots
    #[serde(default = "default_link_selector")]
    pub link_selector: String,

    /// How pages are fetched
    #[serde(default)]
    pub strategy: FetchStrategyConfig,

    /// Directory that holds snapshot slots
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// Which result links may become the top URL
    #[serde(flatten)]
    pub result_filter: ResultFilterConfig,
}

/// Fetch strategy selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FetchStrategyConfig {
    /// Single HTTP GET with spoofed browser headers
    Direct(DirectFetchConfig),

    /// Full render through a WebDriver-controlled browser
    Browser(BrowserFetchConfig),
}

impl Default for FetchStrategyConfig {
    fn default() -> Self {
        Self::Direct(DirectFetchConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectFetchConfig {
    /// Request timeout in seconds; no timeout when absent
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept")]
    pub accept: Option<String>,

    #[serde(default = "default_accept_language")]
    pub accept_language: Option<String>,

    #[serde(default = "default_referer")]
    pub referer: Option<String>,

    /// Send `Connection: keep-alive`
    #[serde(default = "default_true")]
    pub keep_alive: bool,
}

impl Default for DirectFetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            user_agent: default_user_agent(),
            accept: default_accept(),
            accept_language: default_accept_language(),
            referer: default_referer(),
            keep_alive: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserFetchConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Upper bound for navigation plus the idle wait
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// How long the network must stay quiet before the page counts as rendered
    #[serde(default = "default_idle_settle_ms")]
    pub idle_settle_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Try well-known local WebDriver ports when `webdriver_url` is unreachable
    #[serde(default = "default_true")]
    pub fallback_endpoints: bool,
}

impl Default for BrowserFetchConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: true,
            navigation_timeout_secs: default_navigation_timeout_secs(),
            idle_settle_ms: default_idle_settle_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            fallback_endpoints: true,
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            search_url_template: default_search_url_template(),
            result_selector: default_result_selector(),
            link_selector: default_link_selector(),
            strategy: FetchStrategyConfig::default(),
            snapshot_dir: default_snapshot_dir(),
            result_filter: ResultFilterConfig::default(),
        }
    }
}

impl HarvestConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .map_err(|e| HarvestError::Config(format!("{}: {e}", path.display())))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: Self =
            serde_json::from_str(json).map_err(|e| HarvestError::Config(e.to_string()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override the WebDriver URL with an environment variable if provided
    pub fn apply_env_overrides(&mut self) {
        if let FetchStrategyConfig::Browser(browser) = &mut self.strategy {
            if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
                if !webdriver_url.is_empty() {
                    browser.webdriver_url = webdriver_url;
                }
            }
        }
    }
}

fn default_search_url_template() -> String {
    "https://www.bing.com/search?q={query}".to_string()
}

/// Bing organic results sit in `li.b_algo` with the title link under `h2`
fn default_result_selector() -> String {
    "li.b_algo h2 a".to_string()
}

fn default_link_selector() -> String {
    "li a".to_string()
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept() -> Option<String> {
    Some("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8".to_string())
}

fn default_accept_language() -> Option<String> {
    Some("zh-CN,zh;q=0.9".to_string())
}

fn default_referer() -> Option<String> {
    Some("https://www.bing.com/".to_string())
}

fn default_true() -> bool {
    true
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_navigation_timeout_secs() -> u64 {
    30
}

fn default_idle_settle_ms() -> u64 {
    500
}

fn default_poll_interval_ms() -> u64 {
    100
}
