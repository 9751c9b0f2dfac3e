use agora_types::{ErrorCode, ValidationError};
use url::Url;

use super::Checked;

/// Empty and bare-scheme values collapse to "", a missing scheme gets
/// `http://`, anything that is still not an http(s) URL with a host fails.
pub fn normalize_website(raw: &str) -> Checked<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("http://") || raw.eq_ignore_ascii_case("https://")
    {
        return Ok(String::new());
    }

    let lowered = raw.to_ascii_lowercase();
    let candidate = if lowered.starts_with("http://") || lowered.starts_with("https://") {
        raw.to_string()
    } else if raw.contains("://") {
        return Err(invalid());
    } else {
        format!("http://{raw}")
    };

    match Url::parse(&candidate) {
        Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(candidate),
        _ => Err(invalid()),
    }
}

fn invalid() -> ValidationError {
    ValidationError::new(ErrorCode::InvalidFormat, "invalid_website")
}
