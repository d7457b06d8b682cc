use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Rules deciding which result links may become the top URL
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultFilterConfig {
    /// Regex patterns for URLs to include (if empty, all URLs are included unless excluded)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Regex patterns for URLs to exclude (these take precedence over include patterns)
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Filter applied to resolved result links, in document order
#[derive(Debug, Default)]
pub struct ResultFilter {
    include_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl ResultFilter {
    /// Create a new result filter from configuration
    pub fn new(config: &ResultFilterConfig) -> Result<Self, regex::Error> {
        let include_regexes = config
            .include_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude_regexes = config
            .exclude_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include_regexes,
            exclude_regexes,
        })
    }

    /// Whether a resolved link qualifies as a result to follow
    pub fn accepts(&self, url: &Url) -> bool {
        // Only web pages can be fetched
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        // Check regex exclusions (these take precedence)
        let url_str = url.as_str();
        if self.exclude_regexes.iter().any(|r| r.is_match(url_str)) {
            return false;
        }

        // If include patterns are specified, at least one must match
        self.include_regexes.is_empty() || self.include_regexes.iter().any(|r| r.is_match(url_str))
    }
}
