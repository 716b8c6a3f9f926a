//! Platform dispatch: a static mapping from platform to extractor slot.
//!
//! Slots are filled once at startup; a backend that fails to construct is
//! recorded as unavailable (served as 503) rather than crashing. The
//! URL-shape check runs before the slot is consulted, so a mismatched URL
//! is always a client error, never "downloader unavailable".

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::extract::ytdlp::YtDlpExtractor;
use crate::extract::Extractor;
use crate::platform::Platform;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub enum Slot {
    Ready(Arc<dyn Extractor>),
    Unavailable(String),
}

pub struct Dispatcher {
    slots: BTreeMap<Platform, Slot>,
}

impl Dispatcher {
    /// Builds the production mapping: yt-dlp backs youtube, instagram and
    /// facebook; spotify is registered but not enabled.
    pub fn build(cfg: &GatewayConfig) -> Self {
        let mut slots = BTreeMap::new();
        let ytdlp_platforms = [Platform::Youtube, Platform::Instagram, Platform::Facebook];

        match YtDlpExtractor::new(
            &cfg.ytdlp_bin,
            Duration::from_secs(cfg.probe_timeout_secs),
            Duration::from_secs(cfg.fetch_timeout_secs),
        ) {
            Ok(backend) => {
                let backend: Arc<dyn Extractor> = Arc::new(backend);
                for platform in ytdlp_platforms {
                    slots.insert(platform, Slot::Ready(Arc::clone(&backend)));
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "yt-dlp backend failed to construct; platforms recorded unavailable");
                for platform in ytdlp_platforms {
                    slots.insert(platform, Slot::Unavailable(e.to_string()));
                }
            }
        }

        slots.insert(
            Platform::Spotify,
            Slot::Unavailable("spotify integration is not enabled".to_string()),
        );
        Self { slots }
    }

    /// Mapping injected directly; used by tests and alternative wiring.
    pub fn with_slots(slots: BTreeMap<Platform, Slot>) -> Self {
        Self { slots }
    }

    /// Shape check, then slot lookup. Errors are terminal for the request.
    pub fn resolve(
        &self,
        platform: Platform,
        url: &Url,
    ) -> Result<Arc<dyn Extractor>, GatewayError> {
        if !platform.matches_url(url) {
            return Err(GatewayError::Validation(format!(
                "URL host does not match platform '{platform}'"
            )));
        }
        match self.slots.get(&platform) {
            None => Err(GatewayError::Unsupported(platform.to_string())),
            Some(Slot::Ready(extractor)) => Ok(Arc::clone(extractor)),
            Some(Slot::Unavailable(reason)) => Err(GatewayError::Unavailable(reason.clone())),
        }
    }

    /// Per-platform readiness, for the health endpoint.
    pub fn availability(&self) -> BTreeMap<Platform, bool> {
        self.slots
            .iter()
            .map(|(p, slot)| (*p, matches!(slot, Slot::Ready(_))))
            .collect()
    }
}
