//! Opaque video-ID resolution.
//!
//! Accepts a bare 11-character token or any of the canonical URL shapes
//! (watch URL, shortened URL, embed URL, legacy `v=` parameter in various
//! positions). Anything else fails to resolve.

use regex::Regex;

/// URL shapes tried in order after the bare-token check.
const URL_PATTERNS: [&str; 5] = [
    r"(?:youtube\.com/watch\?v=|youtu\.be/)([A-Za-z0-9_-]{11})",
    r"youtube\.com/embed/([A-Za-z0-9_-]{11})",
    r"youtube\.com/v/([A-Za-z0-9_-]{11})",
    r"youtube\.com/(?:.*?)#(?:.*?)v=([A-Za-z0-9_-]{11})",
    r"youtube\.com/watch\?(?:.*?)v=([A-Za-z0-9_-]{11})",
];

/// Resolve an 11-character video id from a bare token or URL.
///
/// Returns `None` when no accepted shape matches.
pub fn extract_video_id(input: &str) -> Option<String> {
    if input.is_empty() {
        return None;
    }

    // Check if it's already just an id (11 characters)
    let bare = Regex::new(r"^[A-Za-z0-9_-]{11}$").ok()?;
    if bare.is_match(input) {
        return Some(input.to_string());
    }

    for pattern in URL_PATTERNS {
        let re = Regex::new(pattern).ok()?;
        if let Some(cap) = re.captures(input) {
            return Some(cap[1].to_string());
        }
    }

    None
}
