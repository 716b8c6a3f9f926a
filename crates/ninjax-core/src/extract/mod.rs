//! Extractor capability seam.
//!
//! The gateway only depends on the [`Extractor`] trait and does not know
//! which backend resolves a platform URL into metadata or bytes. Backends
//! are swappable per platform without touching any other component.

pub mod policy;
pub mod ytdlp;

use crate::credentials::CredentialHandle;
use crate::error::GatewayError;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

/// One selectable format of a probed media item.
#[derive(Debug, Clone, Serialize)]
pub struct FormatDescriptor {
    pub format_id: String,
    /// Quality label shown to clients: `"720p"` for video, `"MP3"` for the
    /// synthetic audio entry.
    pub quality: String,
    /// Exact size when the platform reports one, else an estimate or absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    pub ext: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

/// Result of a probe. Not persisted anywhere; returned straight to the
/// caller. Optional fields stay absent in JSON when a platform lacks them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metadata {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,
    pub formats: Vec<FormatDescriptor>,
}

/// What the client asked to fetch. `quality == "MP3"` selects the synthetic
/// audio path; otherwise `format_id` (default `best`) is passed through.
#[derive(Debug, Clone, Default)]
pub struct FormatSelector {
    pub format_id: Option<String>,
    pub quality: Option<String>,
}

impl FormatSelector {
    pub fn wants_audio(&self) -> bool {
        self.quality
            .as_deref()
            .is_some_and(|q| q.eq_ignore_ascii_case("mp3"))
    }

    pub fn expression(&self) -> &str {
        self.format_id.as_deref().unwrap_or("best")
    }
}

/// Outcome of a fetch. Some platforms can only scrape metadata; that is a
/// first-class outcome here, never a stand-in file.
#[derive(Debug)]
pub enum FetchOutcome {
    Media {
        /// Temp file inside the caller-provided directory; the artifact
        /// store takes ownership on commit.
        path: PathBuf,
        ext: String,
        title: Option<String>,
    },
    MetadataOnly(Metadata),
}

/// Failure taxonomy shared by every extractor backend.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The backend could not be constructed or is disabled.
    #[error("extractor unavailable: {0}")]
    Unavailable(String),
    /// Remote resource missing, private, or restricted.
    #[error("media not found or private")]
    NotFound,
    /// Transient network failure reported by the backend.
    #[error("network failure: {0}")]
    Network(String),
    /// The external call exceeded its deadline.
    #[error("timed out after {0}s")]
    Timeout(u64),
    /// The backend finished but left a zero-length file.
    #[error("fetch produced an empty file")]
    IncompleteWrite,
    #[error("{0}")]
    Unknown(String),
}

impl From<ExtractError> for GatewayError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::Unavailable(msg) => GatewayError::Unavailable(msg),
            ExtractError::NotFound => GatewayError::NotFound,
            ExtractError::Network(msg) => GatewayError::Network(msg),
            ExtractError::Timeout(secs) => GatewayError::Timeout(secs),
            ExtractError::IncompleteWrite => {
                GatewayError::Network("transfer ended with an empty file".to_string())
            }
            ExtractError::Unknown(msg) => GatewayError::Network(msg),
        }
    }
}

/// A platform integration: probe for metadata, fetch to a temp location.
/// Both calls are network-bound and must run off the request-accepting path;
/// the server holds a bounded semaphore around them.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Stable identifier for logs and health output.
    fn id(&self) -> &'static str;

    /// Read-only metadata probe. Never touches the storage root.
    async fn probe(
        &self,
        url: &Url,
        cookies: Option<&CredentialHandle>,
    ) -> Result<Metadata, ExtractError>;

    /// Fetches the selected format into `temp_dir`. Must not assume final
    /// placement; the artifact store moves the file on commit.
    async fn fetch(
        &self,
        url: &Url,
        selector: &FormatSelector,
        cookies: Option<&CredentialHandle>,
        temp_dir: &Path,
    ) -> Result<FetchOutcome, ExtractError>;
}
