use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Markup of one page captured at one point in time.
///
/// The text is shared, never mutated; cloning hands out another read-only view.
#[derive(Clone, PartialEq, Eq)]
pub struct HtmlDocument(Arc<str>);

impl HtmlDocument {
    pub fn new(html: impl Into<String>) -> Self {
        let html: String = html.into();
        Self(Arc::from(html))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for HtmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlDocument")
            .field("bytes", &self.0.len())
            .finish()
    }
}

impl AsRef<str> for HtmlDocument {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<String> for HtmlDocument {
    fn from(html: String) -> Self {
        Self::new(html)
    }
}

impl From<&str> for HtmlDocument {
    fn from(html: &str) -> Self {
        Self::new(html)
    }
}

/// What a fetcher hands back for one request
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Address the content was served from, after any redirects
    pub final_url: String,

    pub html: HtmlDocument,
}

impl FetchedPage {
    pub fn new(final_url: impl Into<String>, html: impl Into<HtmlDocument>) -> Self {
        Self {
            final_url: final_url.into(),
            html: html.into(),
        }
    }
}

/// A fetched page together with where and when it came from
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL that was requested
    pub source_url: String,

    /// URL the page was served from; relative links resolve against this
    pub final_url: String,

    /// Page markup as returned by the fetcher
    pub html: HtmlDocument,

    /// Capture time in milliseconds since the Unix epoch
    pub fetched_at_epoch_millis: i64,
}

/// An anchor element projected to its target and visible text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Raw `href` value, relative or absolute
    pub url: String,

    /// Trimmed text content; empty when the anchor has no text
    pub text: String,
}

impl LinkRecord {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
        }
    }
}

/// Deduplicated email addresses in first-occurrence order.
///
/// Equality is exact: `a@b.com` and `A@B.COM` are distinct entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailSet {
    ordered: Vec<String>,
    seen: HashSet<String>,
}

impl EmailSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an address, returning false if it was already present
    pub fn insert(&mut self, email: &str) -> bool {
        if self.seen.contains(email) {
            return false;
        }
        self.seen.insert(email.to_string());
        self.ordered.push(email.to_string());
        true
    }

    pub fn contains(&self, email: &str) -> bool {
        self.seen.contains(email)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ordered
    }

    pub fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

impl<'a> FromIterator<&'a str> for EmailSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = Self::new();
        for email in iter {
            set.insert(email);
        }
        set
    }
}

impl Serialize for EmailSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.ordered)
    }
}

/// Outcome of a successful pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineResult {
    /// First result link, when the run searched for one
    pub top_url: Option<String>,

    /// Link records, populated by the snapshot flow
    pub links: Vec<LinkRecord>,

    /// Addresses found on the top result page
    pub emails: EmailSet,
}
