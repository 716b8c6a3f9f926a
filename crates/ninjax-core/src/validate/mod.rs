//! Input validation: URL allow-listing and filename hygiene.
//!
//! Pure functions with no side effects. `validate_url` is total over all
//! strings and never panics; the request gateway calls it before any
//! platform dispatch.

mod filename;

pub use filename::{sanitize_filename, validate_file_extension};

use std::fmt;
use url::{Host, Url};

/// Maximum accepted URL length in bytes.
pub const MAX_URL_LEN: usize = 2048;

/// Host substrings that mark a URL as pointing at something we must not
/// fetch (loopback and obviously-internal names).
const BLOCKED_HOST_KEYWORDS: &[&str] = &["localhost", "internal", "private", "admin"];

/// Substrings indicating script or data-URI injection attempts.
const INJECTION_MARKERS: &[&str] = &["javascript:", "data:", "vbscript:"];

/// Why a URL was rejected. The message is safe to return to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlRejection {
    TooLong,
    Malformed,
    BadScheme(String),
    BlockedHost(String),
    SuspiciousCharacters,
}

impl fmt::Display for UrlRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlRejection::TooLong => write!(f, "URL exceeds {MAX_URL_LEN} characters"),
            UrlRejection::Malformed => write!(f, "invalid URL format"),
            UrlRejection::BadScheme(s) => write!(f, "URL scheme '{s}' is not allowed"),
            UrlRejection::BlockedHost(h) => write!(f, "access to host '{h}' is not allowed"),
            UrlRejection::SuspiciousCharacters => write!(f, "URL contains invalid characters"),
        }
    }
}

/// Validates a raw URL string. Returns the parsed URL on success so callers
/// never re-parse. Rejects over-long input, non-http(s) schemes, loopback and
/// private-network hosts, keyword-blocked hosts, and injection markers.
pub fn validate_url(raw: &str) -> Result<Url, UrlRejection> {
    if raw.len() > MAX_URL_LEN {
        return Err(UrlRejection::TooLong);
    }
    if raw
        .chars()
        .any(|c| matches!(c, '<' | '>' | '"' | '\'' | '\\') || c.is_control())
    {
        return Err(UrlRejection::SuspiciousCharacters);
    }
    let lower = raw.to_ascii_lowercase();
    if INJECTION_MARKERS.iter().any(|m| lower.contains(m)) {
        return Err(UrlRejection::SuspiciousCharacters);
    }

    let parsed = Url::parse(raw.trim()).map_err(|_| UrlRejection::Malformed)?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UrlRejection::BadScheme(other.to_string())),
    }

    match parsed.host() {
        None => Err(UrlRejection::Malformed),
        Some(Host::Domain(d)) => {
            let d = d.to_ascii_lowercase();
            if BLOCKED_HOST_KEYWORDS.iter().any(|k| d.contains(k)) {
                return Err(UrlRejection::BlockedHost(d));
            }
            Ok(parsed)
        }
        Some(Host::Ipv4(ip)) => {
            if ip.is_loopback() || ip.is_private() || ip.is_unspecified() || ip.is_link_local() {
                return Err(UrlRejection::BlockedHost(ip.to_string()));
            }
            Ok(parsed)
        }
        Some(Host::Ipv6(ip)) => {
            // fc00::/7 unique-local check is not yet stable in std.
            let unique_local = (ip.segments()[0] & 0xfe00) == 0xfc00;
            if ip.is_loopback() || ip.is_unspecified() || unique_local {
                return Err(UrlRejection::BlockedHost(ip.to_string()));
            }
            Ok(parsed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_normal_media_urls() {
        assert!(validate_url("https://www.youtube.com/watch?v=abc").is_ok());
        assert!(validate_url("http://youtu.be/abc").is_ok());
        assert!(validate_url("https://www.instagram.com/p/XYZ/").is_ok());
    }

    #[test]
    fn rejects_non_urls() {
        assert_eq!(validate_url("not-a-url"), Err(UrlRejection::Malformed));
        assert_eq!(validate_url(""), Err(UrlRejection::Malformed));
    }

    #[test]
    fn rejects_bad_schemes() {
        assert!(matches!(
            validate_url("ftp://example.com/file"),
            Err(UrlRejection::BadScheme(_))
        ));
        assert!(matches!(
            validate_url("file:///etc/passwd"),
            Err(UrlRejection::BadScheme(_))
        ));
    }

    #[test]
    fn rejects_loopback_and_private_hosts() {
        assert!(matches!(
            validate_url("http://localhost/x"),
            Err(UrlRejection::BlockedHost(_))
        ));
        assert!(matches!(
            validate_url("http://127.0.0.1/x"),
            Err(UrlRejection::BlockedHost(_))
        ));
        assert!(matches!(
            validate_url("http://192.168.1.5/x"),
            Err(UrlRejection::BlockedHost(_))
        ));
        assert!(matches!(
            validate_url("http://10.0.0.9/x"),
            Err(UrlRejection::BlockedHost(_))
        ));
        assert!(matches!(
            validate_url("http://[::1]/x"),
            Err(UrlRejection::BlockedHost(_))
        ));
        assert!(matches!(
            validate_url("http://admin.corp.example/x"),
            Err(UrlRejection::BlockedHost(_))
        ));
    }

    #[test]
    fn rejects_injection_markers() {
        assert_eq!(
            validate_url("https://example.com/<script>"),
            Err(UrlRejection::SuspiciousCharacters)
        );
        assert_eq!(
            validate_url("javascript:alert(1)"),
            Err(UrlRejection::SuspiciousCharacters)
        );
        assert_eq!(
            validate_url("https://example.com/?q=data:text/html;base64,xx"),
            Err(UrlRejection::SuspiciousCharacters)
        );
        assert_eq!(
            validate_url("https://example.com/a\"b"),
            Err(UrlRejection::SuspiciousCharacters)
        );
    }

    #[test]
    fn rejects_over_long_urls() {
        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LEN));
        assert_eq!(validate_url(&long), Err(UrlRejection::TooLong));
    }

    #[test]
    fn total_over_garbage_input() {
        // Must never panic, whatever the bytes.
        for s in ["%%%", "http://", "https://:80", "\u{202e}cod.exe", "🦀🦀🦀"] {
            let _ = validate_url(s);
        }
    }
}
