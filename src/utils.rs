/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Convert a query or URL to a sanitized filename
pub fn sanitize_filename(raw: &str) -> String {
    // Remove protocol and replace invalid filename characters
    let mut name = raw.replace("http://", "").replace("https://", "");
    name = name.replace(
        ['/', '\\', ':', '?', '&', '=', '#', '%', '*', '"', '<', '>', '|', ' ', '\u{200b}'],
        "_",
    );
    name = name.trim_matches(['_', '.']).to_string();

    if name.is_empty() {
        return "untitled".to_string();
    }

    // Limit filename length without splitting a multi-byte character
    match name.char_indices().nth(100) {
        Some((cut, _)) => name[..cut].to_string(),
        None => name,
    }
}

/// Snapshot slot name used for a query's results page
pub fn slot_name(raw: &str) -> String {
    format!("{}.srch.htm", sanitize_filename(raw))
}
