use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};
use crate::fetchers::{Fetcher, PageFetcher, QUERY_PLACEHOLDER, Target, fetch_result};
use crate::filter::ResultFilter;
use crate::parsers::{SelectorPolicy, decode_tracking_link, dedup_by_url, extract_emails, extract_links};
use crate::results::{FetchResult, LinkRecord, PipelineResult};
use crate::snapshot::SnapshotStore;
use crate::utils::slot_name;
use url::Url;

/// Which flow a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Search, follow the top result and harvest its email addresses
    Direct,
    /// Load the target's saved results page and harvest its links
    SnapshotThenExtract,
}

/// Sequences fetch, snapshot and extraction for one query at a time.
///
/// Holds no per-run state; every run owns its own fetch results.
pub struct Harvester<F: PageFetcher = Fetcher> {
    fetcher: F,
    store: SnapshotStore,
    search_url_template: String,
    results_policy: SelectorPolicy,
    links_policy: SelectorPolicy,
    filter: ResultFilter,
    dedup_links: bool,
}

impl Harvester<Fetcher> {
    /// Builds a harvester using the fetch strategy named in `config`
    pub fn new(config: HarvestConfig) -> Result<Self> {
        let fetcher = Fetcher::from_config(&config.strategy)?;
        Self::with_fetcher(config, fetcher)
    }
}

impl<F: PageFetcher> Harvester<F> {
    pub fn with_fetcher(config: HarvestConfig, fetcher: F) -> Result<Self> {
        if !config.search_url_template.contains(QUERY_PLACEHOLDER) {
            return Err(HarvestError::Config(format!(
                "search URL template `{}` has no {} placeholder",
                config.search_url_template, QUERY_PLACEHOLDER
            )));
        }
        let results_policy = SelectorPolicy::custom(&config.result_selector)?;
        let links_policy = SelectorPolicy::custom(&config.link_selector)?;
        let filter = ResultFilter::new(&config.result_filter)
            .map_err(|e| HarvestError::Config(format!("invalid result filter pattern: {e}")))?;

        Ok(Self {
            fetcher,
            store: SnapshotStore::new(config.snapshot_dir),
            search_url_template: config.search_url_template,
            results_policy,
            links_policy,
            filter,
            dedup_links: false,
        })
    }

    /// Collapse duplicate URLs in harvested links, keeping the first record
    pub fn with_dedup_links(mut self, dedup: bool) -> Self {
        self.dedup_links = dedup;
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Snapshot slot that holds the results page for `target`
    pub fn slot_for(&self, target: &Target) -> String {
        slot_name(target.label())
    }

    pub async fn run(&self, target: &Target, mode: Mode) -> Result<PipelineResult> {
        match mode {
            Mode::Direct => self.harvest_emails(target).await,
            Mode::SnapshotThenExtract => self.harvest_links(&self.slot_for(target)).await,
        }
    }

    /// Search, take the first qualifying result and collect its email addresses.
    ///
    /// Fails with [`HarvestError::NoResults`] when the results page has no
    /// usable result link.
    pub async fn harvest_emails(&self, target: &Target) -> Result<PipelineResult> {
        let search_url = target.resolve(&self.search_url_template);
        ::log::info!("Searching: {}", search_url);
        let results_page = fetch_result(&self.fetcher, &search_url).await?;

        let top_url = self.top_result(&results_page)?;
        ::log::info!("Top result: {}", top_url);

        let page = fetch_result(&self.fetcher, &top_url).await?;
        let emails = extract_emails(page.html.as_str());
        ::log::info!("Found {} email addresses on {}", emails.len(), top_url);

        Ok(PipelineResult {
            top_url: Some(top_url),
            links: Vec::new(),
            emails,
        })
    }

    /// Harvest every link from a previously saved results page
    pub async fn harvest_links(&self, slot: &str) -> Result<PipelineResult> {
        let html = self.store.load(slot).await?;
        let mut links = extract_links(&html, &self.links_policy);
        if self.dedup_links {
            links = dedup_by_url(links);
        }
        ::log::info!("Harvested {} links from snapshot {}", links.len(), slot);

        Ok(PipelineResult {
            top_url: None,
            links,
            emails: Default::default(),
        })
    }

    /// Fetch the results page for `target` and save it to its snapshot slot
    pub async fn capture(&self, target: &Target) -> Result<FetchResult> {
        let search_url = target.resolve(&self.search_url_template);
        let result = fetch_result(&self.fetcher, &search_url).await?;
        let slot = self.slot_for(target);
        self.store.save(&slot, &result.html).await?;
        ::log::info!("Captured {} into snapshot {}", search_url, slot);
        Ok(result)
    }

    /// First result link in document order that resolves to an acceptable URL.
    ///
    /// Relative links resolve against the address the page was served from.
    fn top_result(&self, results_page: &FetchResult) -> Result<String> {
        let base = Url::parse(&results_page.final_url).map_err(|e| HarvestError::InvalidUrl {
            url: results_page.final_url.clone(),
            message: e.to_string(),
        })?;

        extract_links(&results_page.html, &self.results_policy)
            .iter()
            .find_map(|record| self.resolve_candidate(&base, record))
            .ok_or_else(|| HarvestError::NoResults {
                url: results_page.source_url.clone(),
            })
    }

    fn resolve_candidate(&self, base: &Url, record: &LinkRecord) -> Option<String> {
        let resolved = base.join(&record.url).ok()?;
        let target = Url::parse(&decode_tracking_link(resolved.as_str())).ok()?;
        if self.filter.accepts(&target) {
            Some(target.to_string())
        } else {
            ::log::debug!("Result filter rejected: {}", target);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{FetchedPage, HtmlDocument};
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const SEARCH_TEMPLATE: &str = "https://search.test/search?q={query}";

    /// Serves canned pages and records every requested URL
    #[derive(Default)]
    struct StubFetcher {
        pages: HashMap<String, FetchedPage>,
        requests: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn with_page(self, url: &str, html: &str) -> Self {
            self.with_redirected_page(url, url, html)
        }

        /// Serves `html` for `url` as if the server had redirected to `final_url`
        fn with_redirected_page(mut self, url: &str, final_url: &str, html: &str) -> Self {
            self.pages
                .insert(url.to_string(), FetchedPage::new(final_url, html));
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| HarvestError::network(url, "server responded with status 404"))
        }
    }

    fn config(snapshot_dir: &std::path::Path) -> HarvestConfig {
        HarvestConfig {
            search_url_template: SEARCH_TEMPLATE.to_string(),
            snapshot_dir: snapshot_dir.to_path_buf(),
            ..HarvestConfig::default()
        }
    }

    fn results_page(hrefs: &[&str]) -> String {
        let items = hrefs
            .iter()
            .map(|href| format!(r#"<li class="b_algo"><h2><a href="{href}">result</a></h2></li>"#))
            .collect::<String>();
        format!(r#"<html><body><ol id="b_results">{items}</ol></body></html>"#)
    }

    #[tokio::test]
    async fn test_search_and_harvest_emails() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::default()
            .with_page(
                "https://search.test/search?q=acme%20corp",
                &results_page(&["https://acme.test/contact", "https://other.test/"]),
            )
            .with_page(
                "https://acme.test/contact",
                "<p>sales@acme.test</p><p>SALES@acme.test</p><a href='mailto:sales@acme.test'>x</a>",
            );
        let harvester = Harvester::with_fetcher(config(dir.path()), fetcher).unwrap();

        let result = harvester
            .run(&Target::Query("acme corp".to_string()), Mode::Direct)
            .await
            .unwrap();

        assert_eq!(result.top_url.as_deref(), Some("https://acme.test/contact"));
        assert_eq!(
            result.emails.into_vec(),
            vec!["sales@acme.test", "SALES@acme.test"]
        );
        assert!(result.links.is_empty());
        assert_eq!(
            harvester.fetcher.requests(),
            vec![
                "https://search.test/search?q=acme%20corp",
                "https://acme.test/contact"
            ]
        );
    }

    #[tokio::test]
    async fn test_no_matching_anchors_is_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::default().with_page(
            "https://search.test/search?q=nothing",
            r#"<html><body><p>No results</p><ul><li><a href="https://nav.test/">nav</a></li></ul></body></html>"#,
        );
        let harvester = Harvester::with_fetcher(config(dir.path()), fetcher).unwrap();

        let err = harvester
            .run(&Target::Query("nothing".to_string()), Mode::Direct)
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::NoResults { .. }), "got {err:?}");
        assert_eq!(harvester.fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_result_anchor_without_href_is_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::default().with_page(
            "https://search.test/search?q=x",
            r#"<li class="b_algo"><h2><a>title only</a></h2></li>"#,
        );
        let harvester = Harvester::with_fetcher(config(dir.path()), fetcher).unwrap();

        let err = harvester
            .harvest_emails(&Target::Query("x".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::NoResults { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_relative_tracking_link_is_resolved_and_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let tracking = format!(
            "/ck/a?p=1&amp;u=a1{}",
            URL_SAFE_NO_PAD.encode("https://real.test/about")
        );
        let fetcher = StubFetcher::default()
            .with_page("https://search.test/search?q=real", &results_page(&[&tracking]))
            .with_page("https://real.test/about", "info@real.test");
        let harvester = Harvester::with_fetcher(config(dir.path()), fetcher).unwrap();

        let result = harvester
            .harvest_emails(&Target::Query("real".to_string()))
            .await
            .unwrap();

        assert_eq!(result.top_url.as_deref(), Some("https://real.test/about"));
        assert_eq!(result.emails.into_vec(), vec!["info@real.test"]);
    }

    #[tokio::test]
    async fn test_relative_links_resolve_against_redirected_host() {
        let dir = tempfile::tempdir().unwrap();
        let tracking = format!(
            "/ck/a?u=a1{}",
            URL_SAFE_NO_PAD.encode("https://acme.test/team")
        );
        let fetcher = StubFetcher::default()
            .with_redirected_page(
                "https://search.test/search?q=regional",
                "https://cn.search.test/search?q=regional",
                &results_page(&["/local/about", &tracking]),
            )
            .with_page("https://cn.search.test/local/about", "local@cn.search.test");
        let harvester = Harvester::with_fetcher(config(dir.path()), fetcher).unwrap();

        let result = harvester
            .harvest_emails(&Target::Query("regional".to_string()))
            .await
            .unwrap();

        assert_eq!(
            result.top_url.as_deref(),
            Some("https://cn.search.test/local/about")
        );
        assert_eq!(result.emails.into_vec(), vec!["local@cn.search.test"]);
    }

    #[tokio::test]
    async fn test_filtered_results_fall_through_in_document_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.result_filter.exclude_patterns = vec![r"youtube\.com".to_string()];
        let fetcher = StubFetcher::default()
            .with_page(
                "https://search.test/search?q=v",
                &results_page(&[
                    "javascript:void(0)",
                    "https://www.youtube.com/watch?v=1",
                    "https://second.test/",
                    "https://third.test/",
                ]),
            )
            .with_page("https://second.test/", "hello@second.test");
        let harvester = Harvester::with_fetcher(cfg, fetcher).unwrap();

        let result = harvester
            .harvest_emails(&Target::Query("v".to_string()))
            .await
            .unwrap();
        assert_eq!(result.top_url.as_deref(), Some("https://second.test/"));
    }

    #[tokio::test]
    async fn test_top_page_failure_propagates_unconverted() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::default().with_page(
            "https://search.test/search?q=down",
            &results_page(&["https://down.test/"]),
        );
        let harvester = Harvester::with_fetcher(config(dir.path()), fetcher).unwrap();

        let err = harvester
            .harvest_emails(&Target::Query("down".to_string()))
            .await
            .unwrap_err();
        match err {
            HarvestError::Network { url, .. } => assert_eq!(url, "https://down.test/"),
            other => panic!("expected Network, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_url_target_is_fetched_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::default()
            .with_page(
                "https://custom.test/results?id=7",
                &results_page(&["https://acme.test/"]),
            )
            .with_page("https://acme.test/", "ceo@acme.test");
        let harvester = Harvester::with_fetcher(config(dir.path()), fetcher).unwrap();

        let result = harvester
            .harvest_emails(&Target::Url("https://custom.test/results?id=7".to_string()))
            .await
            .unwrap();
        assert_eq!(result.emails.into_vec(), vec!["ceo@acme.test"]);
    }

    #[tokio::test]
    async fn test_snapshot_then_extract_links() {
        let dir = tempfile::tempdir().unwrap();
        let harvester =
            Harvester::with_fetcher(config(dir.path()), StubFetcher::default()).unwrap();
        let target = Target::Query("台积电".to_string());
        let html = HtmlDocument::from(
            r#"<ul><li><a href="https://a.test/">A</a></li><li><a>none</a></li><li><a href="/b"></a></li></ul>"#,
        );
        harvester
            .store()
            .save(&harvester.slot_for(&target), &html)
            .await
            .unwrap();

        let result = harvester
            .run(&target, Mode::SnapshotThenExtract)
            .await
            .unwrap();

        assert_eq!(result.top_url, None);
        assert!(result.emails.is_empty());
        assert_eq!(
            result.links,
            vec![LinkRecord::new("https://a.test/", "A"), LinkRecord::new("/b", "")]
        );
        assert!(harvester.fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let harvester =
            Harvester::with_fetcher(config(dir.path()), StubFetcher::default()).unwrap();

        let err = harvester.harvest_links("missing-slot").await.unwrap_err();
        assert!(matches!(err, HarvestError::NotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_capture_feeds_snapshot_flow_with_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let page = r#"<li><a href="https://a.test/">A</a></li><li><a href="https://a.test/">A2</a></li>"#;
        let fetcher =
            StubFetcher::default().with_page("https://search.test/search?q=dup", page);
        let harvester = Harvester::with_fetcher(config(dir.path()), fetcher)
            .unwrap()
            .with_dedup_links(true);
        let target = Target::Query("dup".to_string());

        let captured = harvester.capture(&target).await.unwrap();
        assert_eq!(captured.source_url, "https://search.test/search?q=dup");
        assert_eq!(captured.final_url, captured.source_url);
        assert_eq!(captured.html.as_str(), page);
        assert!(captured.fetched_at_epoch_millis > 0);

        let result = harvester
            .run(&target, Mode::SnapshotThenExtract)
            .await
            .unwrap();
        assert_eq!(result.links, vec![LinkRecord::new("https://a.test/", "A")]);
    }

    #[test]
    fn test_invalid_result_selector_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.result_selector = "li[".to_string();
        assert!(matches!(
            Harvester::with_fetcher(cfg, StubFetcher::default()),
            Err(HarvestError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_template_without_query_placeholder_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.search_url_template = "https://search.test/search?q=".to_string();
        match Harvester::with_fetcher(cfg, StubFetcher::default()) {
            Err(HarvestError::Config(message)) => {
                assert!(message.contains("{query}"), "{message}")
            }
            Err(other) => panic!("expected Config, got {other:?}"),
            Ok(_) => panic!("expected Config error"),
        }
    }

    #[tokio::test]
    async fn test_harvest_links_rejects_slots_outside_store() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&dir.path().join("snapshots"));
        let harvester = Harvester::with_fetcher(cfg, StubFetcher::default()).unwrap();
        std::fs::write(dir.path().join("secret.htm"), "<li><a href='x'>x</a></li>").unwrap();

        let err = harvester.harvest_links("../secret.htm").await.unwrap_err();
        assert!(matches!(err, HarvestError::InvalidSlot { .. }), "got {err:?}");
    }

    #[test]
    fn test_invalid_filter_pattern_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.result_filter.include_patterns = vec!["(".to_string()];
        assert!(matches!(
            Harvester::with_fetcher(cfg, StubFetcher::default()),
            Err(HarvestError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_direct_strategy_end_to_end() {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "大水公司"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(results_page(&["/company"])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/company"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<footer>contact: hr@dashui.test, hr@dashui.test</footer>"),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cfg = HarvestConfig {
            search_url_template: format!("{}/search?q={{query}}", server.uri()),
            snapshot_dir: dir.path().to_path_buf(),
            ..HarvestConfig::default()
        };
        let harvester = Harvester::new(cfg).unwrap();

        let result = harvester
            .run(&Target::Query("大水公司".to_string()), Mode::Direct)
            .await
            .unwrap();

        assert_eq!(result.top_url, Some(format!("{}/company", server.uri())));
        assert_eq!(result.emails.into_vec(), vec!["hr@dashui.test"]);
    }
}
