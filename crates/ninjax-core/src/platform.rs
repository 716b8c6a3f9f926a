//! Closed set of supported platforms and their URL-shape checks.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// A platform the gateway knows how to dispatch. Adding a platform means
/// adding a variant here and a slot in the dispatcher; nothing else changes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Instagram,
    Facebook,
    Spotify,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Youtube,
        Platform::Instagram,
        Platform::Facebook,
        Platform::Spotify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Spotify => "spotify",
        }
    }

    /// Hosts a URL must belong to for this platform.
    pub fn hosts(&self) -> &'static [&'static str] {
        match self {
            Platform::Youtube => &["youtube.com", "youtu.be"],
            Platform::Instagram => &["instagram.com"],
            Platform::Facebook => &["facebook.com", "fb.watch"],
            Platform::Spotify => &["spotify.com", "open.spotify.com"],
        }
    }

    /// True if the URL's host is one of this platform's hosts or a
    /// subdomain of one (`www.youtube.com` matches `youtube.com`).
    pub fn matches_url(&self, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(h) => h.to_ascii_lowercase(),
            None => return false,
        };
        self.hosts()
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{h}")))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "youtube" => Ok(Platform::Youtube),
            "instagram" => Ok(Platform::Instagram),
            "facebook" => Ok(Platform::Facebook),
            "spotify" => Ok(Platform::Spotify),
            other => Err(GatewayError::Unsupported(other.to_string())),
        }
    }
}
