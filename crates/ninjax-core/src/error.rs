//! Gateway error taxonomy.
//!
//! Every request path through validator, dispatcher, extractor and artifact
//! store terminates in one of these kinds; the HTTP layer maps each kind to
//! a status code and a client-safe message.

use thiserror::Error;

/// Terminal error for a gateway request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Bad input (URL, filename, missing field). Message is safe to show.
    #[error("{0}")]
    Validation(String),
    /// Platform identifier outside the closed set.
    #[error("unsupported platform: {0}")]
    Unsupported(String),
    /// Extractor failed to construct or the integration is disabled.
    #[error("downloader unavailable: {0}")]
    Unavailable(String),
    /// Remote media missing, private, or otherwise inaccessible.
    #[error("media not found or not accessible")]
    NotFound,
    /// Transient network failure inside the extractor. Not retried here.
    #[error("network error: {0}")]
    Network(String),
    /// External call exceeded its deadline. Not retried here.
    #[error("operation timed out after {0}s")]
    Timeout(u64),
    /// Disk write/move failure. Logged in full, returned generically.
    #[error("storage failure")]
    Storage(#[from] std::io::Error),
    /// Per-route budget exhausted. Terminal for this request.
    #[error("rate limit exceeded")]
    RateLimited,
}

impl GatewayError {
    /// Message suitable for the client envelope. Internal detail (storage
    /// errors, raw network messages) is replaced with a generic phrase; the
    /// full error stays in the server log.
    pub fn client_message(&self) -> String {
        match self {
            GatewayError::Network(_) => "network error while contacting the platform".to_string(),
            GatewayError::Timeout(_) => "the platform did not respond in time".to_string(),
            GatewayError::Storage(_) => "internal storage error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_hides_internal_detail() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "/srv/secret/path: disk full");
        let err = GatewayError::from(io);
        assert_eq!(err.client_message(), "internal storage error");

        let net = GatewayError::Network("dns lookup failed for internal-cdn".into());
        assert_eq!(
            net.client_message(),
            "network error while contacting the platform"
        );
    }

    #[test]
    fn client_message_keeps_validation_text() {
        let err = GatewayError::Validation("URL scheme must be http or https".into());
        assert_eq!(err.client_message(), "URL scheme must be http or https");
        assert_eq!(
            GatewayError::RateLimited.client_message(),
            "rate limit exceeded"
        );
    }
}
