//! Artifact lifecycle: commit, root-checked resolve, periodic reclamation.
//!
//! The store is the only component that writes to or deletes from the
//! storage root. Every resolve re-validates that the canonical path is
//! still under the root; the check is not a commit-time-only affair.

pub mod sweep;

use crate::error::GatewayError;
use crate::platform::Platform;
use crate::validate::{sanitize_filename, validate_file_extension};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// A committed, servable file with a bounded lifetime.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub id: Uuid,
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub size_bytes: u64,
    #[serde(skip)]
    pub created: SystemTime,
    pub platform: Platform,
    pub title: String,
}

#[derive(Debug)]
pub struct ArtifactStore {
    /// Canonicalized at construction; resolve compares against this.
    root: PathBuf,
    prefix: String,
}

impl ArtifactStore {
    pub fn new(root: &Path, prefix: &str) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let root = root.canonicalize()?;
        let prefix = sanitize_filename(prefix);
        Ok(Self { root, prefix })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Moves a fetched temp file into the storage root under a fresh
    /// `{prefix}_{unix_ts}_{short_id}.{ext}` name. Identifiers are freshly
    /// generated per commit, so concurrent commits never collide.
    pub fn commit(
        &self,
        temp: &Path,
        declared_ext: &str,
        platform: Platform,
        title: &str,
    ) -> Result<Artifact, GatewayError> {
        let id = Uuid::new_v4();
        let short = &id.simple().to_string()[..8];
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let ext = normalize_ext(declared_ext);
        let file_name = format!("{}_{ts}_{short}.{ext}", self.prefix);
        let dest = self.root.join(&file_name);

        move_file(temp, &dest)?;
        let size_bytes = fs::metadata(&dest)?.len();
        tracing::info!(
            artifact = %file_name,
            platform = %platform,
            size_bytes,
            "artifact committed"
        );

        Ok(Artifact {
            id,
            file_name,
            path: dest,
            size_bytes,
            created: SystemTime::now(),
            platform,
            title: title.to_string(),
        })
    }

    /// Resolves a client-supplied name to an on-disk path, or None for
    /// anything missing, traversal-shaped, or outside the root. The
    /// containment check runs on every call.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let safe = sanitize_filename(name);
        if safe.is_empty() || safe != name {
            return None;
        }
        let candidate = self.root.join(&safe);
        let canonical = candidate.canonicalize().ok()?;
        if !canonical.starts_with(&self.root) {
            tracing::warn!(name = %name, "resolve escaped storage root; refusing");
            return None;
        }
        canonical.is_file().then_some(canonical)
    }
}

/// Extension for the committed name: lowercase alphanumerics only, never on
/// the executable denylist, `bin` when nothing usable is declared.
fn normalize_ext(declared: &str) -> String {
    let ext: String = declared
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(10)
        .collect();
    if ext.is_empty() || !validate_file_extension(&format!("x.{ext}")) {
        return "bin".to_string();
    }
    ext
}

/// Rename when possible, copy-then-remove when the temp dir lives on a
/// different filesystem.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            if let Err(e) = fs::remove_file(from) {
                tracing::warn!(path = %from.display(), error = %e, "temp file left behind after copy");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), "Downloader_NinjaX").unwrap();
        (dir, store)
    }

    fn temp_media(dir: &Path, bytes: &[u8]) -> PathBuf {
        let path = dir.join("incoming.tmp");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn commit_names_and_moves() {
        let (dir, store) = store();
        let scratch = tempfile::tempdir().unwrap();
        let temp = temp_media(scratch.path(), b"media bytes");

        let artifact = store
            .commit(&temp, "mp4", Platform::Youtube, "A Title")
            .unwrap();
        assert!(artifact.file_name.starts_with("Downloader_NinjaX_"));
        assert!(artifact.file_name.ends_with(".mp4"));
        assert_eq!(artifact.size_bytes, 11);
        assert!(!temp.exists());
        assert!(dir.path().join(&artifact.file_name).exists());
    }

    #[test]
    fn commit_defuses_hostile_extension() {
        let (_dir, store) = store();
        let scratch = tempfile::tempdir().unwrap();

        let temp = temp_media(scratch.path(), b"x");
        let artifact = store
            .commit(&temp, "exe", Platform::Facebook, "t")
            .unwrap();
        assert!(artifact.file_name.ends_with(".bin"));

        let temp = temp_media(scratch.path(), b"x");
        let artifact = store
            .commit(&temp, "../mp4", Platform::Facebook, "t")
            .unwrap();
        assert!(artifact.file_name.ends_with(".mp4"));
    }

    #[test]
    fn resolve_round_trip() {
        let (_dir, store) = store();
        let scratch = tempfile::tempdir().unwrap();
        let temp = temp_media(scratch.path(), b"data");
        let artifact = store.commit(&temp, "mp3", Platform::Youtube, "t").unwrap();

        let resolved = store.resolve(&artifact.file_name).expect("resolves");
        assert_eq!(resolved, artifact.path);
    }

    #[test]
    fn resolve_refuses_traversal_and_absolute_names() {
        let (_dir, store) = store();
        assert!(store.resolve("../../etc/passwd").is_none());
        assert!(store.resolve("/etc/passwd").is_none());
        assert!(store.resolve("..").is_none());
        assert!(store.resolve("").is_none());
        assert!(store.resolve("nonexistent.mp4").is_none());
    }

    #[test]
    fn resolve_refuses_symlink_escape() {
        let (dir, store) = store();
        let outside = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secret.txt");
        fs::write(&secret, b"secret").unwrap();
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(&secret, dir.path().join("link.txt")).unwrap();
            assert!(store.resolve("link.txt").is_none());
        }
    }

    #[test]
    fn concurrent_commits_get_distinct_identifiers() {
        let (_dir, store) = store();
        let store = std::sync::Arc::new(store);
        let scratch = tempfile::tempdir().unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = std::sync::Arc::clone(&store);
            let temp = temp_media(scratch.path(), b"payload");
            let renamed = scratch.path().join(format!("in-{i}.tmp"));
            fs::rename(&temp, &renamed).unwrap();
            handles.push(std::thread::spawn(move || {
                store
                    .commit(&renamed, "mp4", Platform::Youtube, "t")
                    .unwrap()
            }));
        }
        let artifacts: Vec<Artifact> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let ids: std::collections::BTreeSet<Uuid> = artifacts.iter().map(|a| a.id).collect();
        let names: std::collections::BTreeSet<&str> =
            artifacts.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(ids.len(), 8);
        assert_eq!(names.len(), 8);
    }
}
