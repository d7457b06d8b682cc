use crate::error::{HarvestError, Result};
use crate::results::{HtmlDocument, LinkRecord};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Which anchor elements count as link candidates
#[derive(Debug, Clone)]
pub struct SelectorPolicy {
    css: String,
    selector: Selector,
}

impl SelectorPolicy {
    /// Every anchor nested in a list item (`li a`)
    pub fn list_anchors() -> Self {
        Self::builtin("li a")
    }

    /// Title links of organic search results (`li.b_algo h2 a`)
    pub fn result_titles() -> Self {
        Self::builtin("li.b_algo h2 a")
    }

    /// Any CSS selector; fails if it does not parse
    pub fn custom(css: &str) -> Result<Self> {
        let selector = Selector::parse(css).map_err(|e| HarvestError::InvalidSelector {
            selector: css.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            css: css.to_string(),
            selector,
        })
    }

    fn builtin(css: &str) -> Self {
        Self {
            css: css.to_string(),
            selector: Selector::parse(css).unwrap(),
        }
    }

    pub fn css(&self) -> &str {
        &self.css
    }
}

impl Default for SelectorPolicy {
    fn default() -> Self {
        Self::list_anchors()
    }
}

/// Projects the anchors matched by `policy` into link records, in document order.
///
/// Malformed markup never fails; missing structure just yields fewer records.
/// Anchors without an `href` are skipped. Duplicate URLs are kept.
pub fn extract_links(html: &HtmlDocument, policy: &SelectorPolicy) -> Vec<LinkRecord> {
    let doc = Html::parse_document(html.as_str());

    let links = doc
        .select(&policy.selector)
        .filter_map(to_link_record)
        .collect::<Vec<_>>();

    ::log::debug!(
        "Link extractor found {} links with `{}`",
        links.len(),
        policy.css
    );
    if !links.is_empty() {
        ::log::trace!(
            "First few links: {:?}",
            links.iter().take(5).map(|l| &l.url).collect::<Vec<_>>()
        );
    }

    links
}

/// Keeps the first record for each URL
pub fn dedup_by_url(records: Vec<LinkRecord>) -> Vec<LinkRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.url.clone()))
        .collect()
}

fn to_link_record(element: ElementRef<'_>) -> Option<LinkRecord> {
    let url = element.value().attr("href")?;
    let text = element.text().collect::<String>();
    Some(LinkRecord::new(url, text.trim()))
}
