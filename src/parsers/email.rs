use crate::results::EmailSet;
use once_cell::sync::Lazy;
use regex::Regex;

/// `local-part @ domain-labels . tld`, matched anywhere in the text
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap()
});

/// Scans raw text for email-shaped substrings.
///
/// Lexical only: anything with the right shape is returned, deliverable or not.
/// Duplicates collapse by exact (case-sensitive) equality and the first
/// occurrence fixes the order.
pub fn extract_emails(text: &str) -> EmailSet {
    let emails = EMAIL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str())
        .collect::<EmailSet>();

    ::log::debug!("Email extractor found {} unique addresses", emails.len());
    emails
}
