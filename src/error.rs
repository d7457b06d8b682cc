use thiserror::Error;

/// Errors surfaced by the fetch, snapshot and extraction pipeline.
///
/// Each pipeline run either succeeds or fails with exactly one of these.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Connection, DNS or non-2xx status failure on a direct request
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    /// The configured request timeout elapsed before a response arrived
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    /// Browser session could not be opened, navigated or read
    #[error("browser navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// No snapshot has been saved under this slot
    #[error("snapshot slot not found: {slot}")]
    NotFound { slot: String },

    /// Slot name would resolve outside the snapshot directory
    #[error("invalid snapshot slot `{slot}`: {message}")]
    InvalidSlot { slot: String, message: String },

    /// The results page had no usable result link
    #[error("no result links found on {url}")]
    NoResults { url: String },

    #[error("invalid selector `{selector}`: {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("invalid url `{url}`: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HarvestError>;

impl HarvestError {
    pub(crate) fn network(url: &str, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn navigation(url: &str, message: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// Maps a reqwest failure onto the network/timeout split.
    pub(crate) fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = error.status() {
            Self::network(url, format!("server responded with status {status}"))
        } else {
            Self::network(url, error.to_string())
        }
    }
}
