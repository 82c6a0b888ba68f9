//! URL helpers shared by validation, filtering and file naming.

use std::borrow::Cow;
use url::Url;

/// True when `url`'s host is `domain` or one of its subdomains
///
/// A leading `www.` on the configured domain is ignored so `www.example.com`
/// and `example.com` accept the same hosts.
#[must_use]
pub fn host_matches_domain(url: &str, domain: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };

    let host = host.to_ascii_lowercase();
    let domain = domain.trim().trim_start_matches("www.").to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }

    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Final non-empty path segment of a URL, percent-decoded where possible
#[must_use]
pub fn last_path_segment(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()?
        .to_string();

    // `Url` keeps percent-encoding; decode what we can for readable file names
    let decoded = urlencoding::decode(&segment).map(Cow::into_owned);
    Some(decoded.unwrap_or(segment))
}

/// Truncate to at most `max_chars` characters for log lines
#[must_use]
pub fn preview(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_matching_accepts_subdomains_only() {
        assert!(host_matches_domain("https://www.quora.com/What-is-Rust", "quora.com"));
        assert!(host_matches_domain("https://quora.com/x", "www.quora.com"));
        assert!(host_matches_domain("https://es.quora.com/x", "quora.com"));
        assert!(!host_matches_domain("https://notquora.com/x", "quora.com"));
        assert!(!host_matches_domain("Invalid URL", "quora.com"));
    }

    #[test]
    fn last_segment_skips_trailing_slash() {
        assert_eq!(
            last_path_segment("https://www.quora.com/What-is-Rust/").as_deref(),
            Some("What-is-Rust")
        );
        assert_eq!(
            last_path_segment("https://example.com/a/Caf%C3%A9").as_deref(),
            Some("Café")
        );
        assert_eq!(
            last_path_segment("https://example.com/q/Rust%20vs%20Go").as_deref(),
            Some("Rust vs Go")
        );
        // Not valid UTF-8 once decoded: keep the encoded form
        assert_eq!(
            last_path_segment("https://example.com/q/bad%FF").as_deref(),
            Some("bad%FF")
        );
        assert_eq!(last_path_segment("https://example.com/"), None);
    }

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(preview("héllo wörld", 4), "héll");
        assert_eq!(preview("abc", 10), "abc");
    }
}
