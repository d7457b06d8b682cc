use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use url::Url;

/// Unwraps a search-engine click-tracking link to the page it points at.
///
/// Bing wraps organic results as `https://www.bing.com/ck/a?...&u=a1<base64>`.
/// Anything that is not such a link, or does not decode to an http(s) URL,
/// comes back unchanged.
pub fn decode_tracking_link(href: &str) -> String {
    match try_decode(href) {
        Some(target) => {
            ::log::debug!("Decoded tracking link to {}", target);
            target
        }
        None => href.to_string(),
    }
}

fn try_decode(href: &str) -> Option<String> {
    if !href.contains("/ck/a?") {
        return None;
    }

    let parsed = Url::parse(href).ok()?;
    let encoded = parsed
        .query_pairs()
        .find(|(key, _)| key == "u")
        .map(|(_, value)| value.into_owned())?;
    let encoded = encoded.strip_prefix("a1").unwrap_or(&encoded);
    let encoded = encoded.trim_end_matches('=');

    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .or_else(|_| STANDARD_NO_PAD.decode(encoded))
        .ok()?;
    let target = String::from_utf8(bytes).ok()?;

    if target.starts_with("http://") || target.starts_with("https://") {
        Some(target)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(target: &str) -> String {
        format!(
            "https://www.bing.com/ck/a?!&&p=abc&ptn=3&u=a1{}&ntb=1",
            URL_SAFE_NO_PAD.encode(target)
        )
    }

    #[test]
    fn test_decodes_bing_tracking_link() {
        let href = wrap("https://www.example.com/contact?x=1");
        assert_eq!(
            decode_tracking_link(&href),
            "https://www.example.com/contact?x=1"
        );
    }

    #[test]
    fn test_plain_links_pass_through() {
        let href = "https://www.example.com/about";
        assert_eq!(decode_tracking_link(href), href);
    }

    #[test]
    fn test_undecodable_payload_passes_through() {
        let href = "https://www.bing.com/ck/a?u=a1!!!notbase64";
        assert_eq!(decode_tracking_link(href), href);
    }

    #[test]
    fn test_tracking_link_without_target_passes_through() {
        let href = "https://www.bing.com/ck/a?p=abc";
        assert_eq!(decode_tracking_link(href), href);
    }

    #[test]
    fn test_non_http_target_passes_through() {
        let href = wrap("javascript:void(0)");
        assert_eq!(decode_tracking_link(&href), href);
    }
}
