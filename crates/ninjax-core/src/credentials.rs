//! Per-platform cookie-jar store.
//!
//! One file per platform under the cookie directory. The store only checks
//! structural plausibility (size, Netscape marker or tab-field density);
//! whether the cookies actually work surfaces later as extractor errors.
//! Uploads replace the backing file atomically (write temp, then rename).

use crate::platform::Platform;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Minimum plausible cookie-jar size in bytes.
pub const MIN_JAR_BYTES: u64 = 64;

/// Header line yt-dlp and curl emit for exported cookie jars.
const NETSCAPE_MARKER: &str = "# Netscape HTTP Cookie File";

/// Netscape cookie lines carry 7 tab-separated fields.
const MIN_TAB_FIELDS: usize = 6;

/// Opaque reference to a stored cookie jar, handed to extractors only.
#[derive(Debug, Clone)]
pub struct CredentialHandle {
    platform: Platform,
    path: PathBuf,
}

impl CredentialHandle {
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Path to the jar file, for passing to the extractor subprocess.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Observability record for one platform's jar. Never carries the path or
/// the jar contents; this is what the status endpoint serializes.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialRecord {
    pub platform: Platform,
    pub exists: bool,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_unix: Option<u64>,
    pub valid: bool,
}

#[derive(Debug)]
pub struct CookieStore {
    dir: PathBuf,
}

impl CookieStore {
    pub fn new(dir: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn jar_path(&self, platform: Platform) -> PathBuf {
        self.dir.join(format!("{}_cookies.txt", platform.as_str()))
    }

    /// Returns a handle only when a plausible jar exists for the platform.
    pub fn get(&self, platform: Platform) -> Option<CredentialHandle> {
        let path = self.jar_path(platform);
        if jar_is_plausible(&path) {
            Some(CredentialHandle { platform, path })
        } else {
            None
        }
    }

    /// Record for every known platform, present or not.
    pub fn status(&self) -> BTreeMap<Platform, CredentialRecord> {
        Platform::ALL
            .iter()
            .map(|&platform| {
                let path = self.jar_path(platform);
                let meta = fs::metadata(&path).ok();
                let record = CredentialRecord {
                    platform,
                    exists: meta.is_some(),
                    size_bytes: meta.as_ref().map(|m| m.len()).unwrap_or(0),
                    modified_unix: meta
                        .and_then(|m| m.modified().ok())
                        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                        .map(|d| d.as_secs()),
                    valid: jar_is_plausible(&path),
                };
                (platform, record)
            })
            .collect()
    }

    /// Overwrites the platform's jar atomically and re-runs validation.
    pub fn set(&self, platform: Platform, content: &str) -> io::Result<CredentialRecord> {
        let path = self.jar_path(platform);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        tracing::info!(platform = %platform, bytes = content.len(), "cookie jar updated");

        let record = self
            .status()
            .remove(&platform)
            .unwrap_or(CredentialRecord {
                platform,
                exists: true,
                size_bytes: content.len() as u64,
                modified_unix: None,
                valid: false,
            });
        Ok(record)
    }
}

/// Structural plausibility only: exists, meets the size floor, and either
/// carries the Netscape header or has at least one tab-dense cookie line.
fn jar_is_plausible(path: &Path) -> bool {
    let meta = match fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        _ => return false,
    };
    if meta.len() < MIN_JAR_BYTES {
        return false;
    }
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return false,
    };
    if content.contains(NETSCAPE_MARKER) {
        return true;
    }
    content
        .lines()
        .filter(|l| !l.starts_with('#') && !l.trim().is_empty())
        .any(|l| l.matches('\t').count() >= MIN_TAB_FIELDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, CookieStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CookieStore::new(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    fn netscape_jar() -> String {
        format!(
            "{NETSCAPE_MARKER}\n# https://curl.haxx.se/docs/http-cookies.html\n\
             .youtube.com\tTRUE\t/\tTRUE\t1999999999\tSID\tabcdef123456\n"
        )
    }

    #[test]
    fn missing_jar_yields_no_handle() {
        let (_dir, store) = store();
        assert!(store.get(Platform::Youtube).is_none());
    }

    #[test]
    fn set_then_get_round_trip() {
        let (_dir, store) = store();
        let record = store.set(Platform::Youtube, &netscape_jar()).unwrap();
        assert!(record.valid);
        let handle = store.get(Platform::Youtube).expect("handle");
        assert_eq!(handle.platform(), Platform::Youtube);
        assert!(handle.path().ends_with("youtube_cookies.txt"));
        // Other platforms are unaffected.
        assert!(store.get(Platform::Instagram).is_none());
    }

    #[test]
    fn tiny_or_markerless_jar_is_invalid() {
        let (_dir, store) = store();
        store.set(Platform::Facebook, "tiny").unwrap();
        assert!(store.get(Platform::Facebook).is_none());

        let padding = "not a cookie jar at all, just prose ".repeat(4);
        store.set(Platform::Facebook, &padding).unwrap();
        assert!(store.get(Platform::Facebook).is_none());
    }

    #[test]
    fn tab_dense_jar_without_marker_is_valid() {
        let (_dir, store) = store();
        let line = ".instagram.com\tTRUE\t/\tTRUE\t1999999999\tsessionid\tdeadbeefcafe1234\n";
        let jar = format!("# exported by hand\n{}{}", line, line);
        let record = store.set(Platform::Instagram, &jar).unwrap();
        assert!(record.valid);
        assert!(store.get(Platform::Instagram).is_some());
    }

    #[test]
    fn status_lists_every_platform() {
        let (_dir, store) = store();
        store.set(Platform::Youtube, &netscape_jar()).unwrap();
        let status = store.status();
        assert_eq!(status.len(), Platform::ALL.len());
        assert!(status[&Platform::Youtube].valid);
        assert!(!status[&Platform::Spotify].exists);
    }
}
