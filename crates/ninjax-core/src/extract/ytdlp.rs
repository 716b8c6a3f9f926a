//! yt-dlp subprocess backend.
//!
//! Probes with `-J` (single JSON document on stdout) and fetches with an
//! output template inside the caller's temp dir. Construction runs
//! `yt-dlp --version`; a missing or broken binary is reported as
//! `Unavailable` so the dispatcher records the platform as down instead of
//! crashing the process.

use super::{
    policy, ExtractError, Extractor, FetchOutcome, FormatDescriptor, FormatSelector, MediaKind,
    Metadata,
};
use crate::credentials::CredentialHandle;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use url::Url;
use uuid::Uuid;

pub struct YtDlpExtractor {
    bin: String,
    probe_timeout: Duration,
    fetch_timeout: Duration,
}

impl YtDlpExtractor {
    pub fn new(
        bin: &str,
        probe_timeout: Duration,
        fetch_timeout: Duration,
    ) -> Result<Self, ExtractError> {
        let out = std::process::Command::new(bin)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ExtractError::Unavailable(format!("cannot run {bin}: {e}")))?;
        if !out.status.success() {
            return Err(ExtractError::Unavailable(format!(
                "{bin} --version exited with {}",
                out.status
            )));
        }
        let version = String::from_utf8_lossy(&out.stdout).trim().to_string();
        tracing::info!(version = %version, "yt-dlp backend ready");
        Ok(Self {
            bin: bin.to_string(),
            probe_timeout,
            fetch_timeout,
        })
    }

    async fn run(&self, mut cmd: Command, deadline: Duration) -> Result<std::process::Output, ExtractError> {
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        match tokio::time::timeout(deadline, cmd.output()).await {
            Err(_) => Err(ExtractError::Timeout(deadline.as_secs())),
            Ok(Err(e)) => Err(ExtractError::Unavailable(format!(
                "failed to spawn {}: {e}",
                self.bin
            ))),
            Ok(Ok(out)) => Ok(out),
        }
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn id(&self) -> &'static str {
        "yt-dlp"
    }

    async fn probe(
        &self,
        url: &Url,
        cookies: Option<&CredentialHandle>,
    ) -> Result<Metadata, ExtractError> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(["-J", "--no-warnings", "--no-playlist"]);
        if let Some(jar) = cookies {
            cmd.arg("--cookies").arg(jar.path());
        }
        cmd.arg(url.as_str());

        let out = self.run(cmd, self.probe_timeout).await?;
        if !out.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&out.stderr)));
        }
        let value: Value = serde_json::from_slice(&out.stdout)
            .map_err(|e| ExtractError::Unknown(format!("unparseable probe output: {e}")))?;
        Ok(parse_metadata(&value))
    }

    async fn fetch(
        &self,
        url: &Url,
        selector: &FormatSelector,
        cookies: Option<&CredentialHandle>,
        temp_dir: &Path,
    ) -> Result<FetchOutcome, ExtractError> {
        let stem = Uuid::new_v4().simple().to_string();
        let template = temp_dir.join(format!("{stem}.%(ext)s"));

        let mut cmd = Command::new(&self.bin);
        cmd.args(["--no-warnings", "--no-playlist", "--no-progress", "--print-json"]);
        if selector.wants_audio() {
            cmd.args(["-f", policy::AUDIO_FORMAT_ID, "-x", "--audio-format", "mp3"]);
        } else {
            cmd.args(["-f", selector.expression()]);
        }
        if let Some(jar) = cookies {
            cmd.arg("--cookies").arg(jar.path());
        }
        cmd.arg("-o").arg(&template);
        cmd.arg(url.as_str());

        let out = self.run(cmd, self.fetch_timeout).await?;
        if !out.status.success() {
            return Err(classify_failure(&String::from_utf8_lossy(&out.stderr)));
        }

        let title = serde_json::from_slice::<Value>(&out.stdout)
            .ok()
            .and_then(|v| v.get("title").and_then(Value::as_str).map(str::to_string));

        let path = find_output(temp_dir, &stem, selector.wants_audio())
            .ok_or_else(|| ExtractError::Unknown("no output file produced".to_string()))?;
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            let _ = std::fs::remove_file(&path);
            return Err(ExtractError::IncompleteWrite);
        }
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_else(|| "bin".to_string());
        Ok(FetchOutcome::Media { path, ext, title })
    }
}

/// Locates the file yt-dlp wrote for the given template stem. After audio
/// post-processing the original container is gone and only `.mp3` remains,
/// but prefer it explicitly in case an intermediate survives.
fn find_output(temp_dir: &Path, stem: &str, prefer_mp3: bool) -> Option<PathBuf> {
    let entries: Vec<PathBuf> = std::fs::read_dir(temp_dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with(stem))
                .unwrap_or(false)
        })
        .collect();
    if prefer_mp3 {
        if let Some(mp3) = entries
            .iter()
            .find(|p| p.extension().is_some_and(|e| e == "mp3"))
        {
            return Some(mp3.clone());
        }
    }
    entries.into_iter().next()
}

/// Maps yt-dlp stderr onto the extractor error taxonomy.
fn classify_failure(stderr: &str) -> ExtractError {
    let lower = stderr.to_ascii_lowercase();

    const NOT_FOUND: &[&str] = &[
        "private video",
        "video unavailable",
        "not available",
        "does not exist",
        "has been removed",
        "members-only",
        "404",
        "age-restricted",
        "sign in to confirm",
    ];
    if NOT_FOUND.iter().any(|m| lower.contains(m)) {
        return ExtractError::NotFound;
    }

    const NETWORK: &[&str] = &[
        "timed out",
        "timeout",
        "connection",
        "network",
        "resolve host",
        "temporary failure",
        "unable to download",
        "http error 5",
    ];
    if NETWORK.iter().any(|m| lower.contains(m)) {
        return ExtractError::Network(first_line(stderr));
    }

    ExtractError::Unknown(first_line(stderr))
}

fn first_line(stderr: &str) -> String {
    stderr
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("extractor failed")
        .trim()
        .to_string()
}

/// Builds [`Metadata`] from a yt-dlp `-J` document: video formats deduped by
/// height (first seen wins), sorted by the quality policy, synthetic audio
/// entry appended.
fn parse_metadata(value: &Value) -> Metadata {
    let duration_secs = value
        .get("duration")
        .and_then(Value::as_f64)
        .map(|d| d as u64);

    let mut formats: Vec<FormatDescriptor> = Vec::new();
    let mut seen_heights: BTreeSet<u64> = BTreeSet::new();
    if let Some(list) = value.get("formats").and_then(Value::as_array) {
        for f in list {
            let vcodec = f.get("vcodec").and_then(Value::as_str).unwrap_or("none");
            let height = f.get("height").and_then(Value::as_u64);
            let format_id = f.get("format_id").and_then(Value::as_str);
            if let (Some(height), Some(format_id)) = (height, format_id) {
                if vcodec != "none" && seen_heights.insert(height) {
                    formats.push(FormatDescriptor {
                        format_id: format_id.to_string(),
                        quality: format!("{height}p"),
                        size_bytes: f
                            .get("filesize")
                            .and_then(Value::as_u64)
                            .or_else(|| f.get("filesize_approx").and_then(Value::as_u64)),
                        ext: f
                            .get("ext")
                            .and_then(Value::as_str)
                            .unwrap_or("mp4")
                            .to_string(),
                        kind: MediaKind::Video,
                    });
                }
            }
        }
    }
    policy::sort_formats(&mut formats);
    formats.push(policy::synthetic_audio(duration_secs));

    let text = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty())
    };

    Metadata {
        title: text("title").unwrap_or_else(|| "Unknown".to_string()),
        description: text("description"),
        thumbnail: text("thumbnail"),
        duration_secs,
        uploader: text("uploader"),
        upload_date: text("upload_date"),
        formats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_not_found_variants() {
        assert!(matches!(
            classify_failure("ERROR: Private video. Sign in if you've been granted access"),
            ExtractError::NotFound
        ));
        assert!(matches!(
            classify_failure("ERROR: [youtube] abc: Video unavailable"),
            ExtractError::NotFound
        ));
    }

    #[test]
    fn classify_network_keeps_first_line() {
        let err = classify_failure("\nERROR: unable to download video data: timed out\n");
        match err {
            ExtractError::Network(msg) => assert!(msg.starts_with("ERROR: unable to download")),
            other => panic!("expected Network, got {other:?}"),
        }
    }

    #[test]
    fn classify_unknown_fallback() {
        assert!(matches!(
            classify_failure("ERROR: something nobody anticipated"),
            ExtractError::Unknown(_)
        ));
        assert!(matches!(classify_failure(""), ExtractError::Unknown(_)));
    }

    #[test]
    fn parse_metadata_dedupes_sorts_and_appends_audio() {
        let doc = serde_json::json!({
            "title": "Test Clip",
            "duration": 60.0,
            "uploader": "someone",
            "upload_date": "20240101",
            "formats": [
                {"format_id": "134", "vcodec": "avc1", "height": 360, "ext": "mp4", "filesize": 1000},
                {"format_id": "135", "vcodec": "avc1", "height": 480, "ext": "mp4"},
                {"format_id": "134-dup", "vcodec": "avc1", "height": 360, "ext": "mp4"},
                {"format_id": "140", "vcodec": "none", "ext": "m4a"},
                {"format_id": "137", "vcodec": "avc1", "height": 1080, "ext": "mp4", "filesize_approx": 9000}
            ]
        });
        let meta = parse_metadata(&doc);
        assert_eq!(meta.title, "Test Clip");
        assert_eq!(meta.duration_secs, Some(60));

        let labels: Vec<&str> = meta.formats.iter().map(|f| f.quality.as_str()).collect();
        assert_eq!(labels, ["1080p", "480p", "360p", "MP3"]);
        // First-seen format id wins for a duplicated height.
        assert_eq!(meta.formats[2].format_id, "134");
        // Audio-only rows never become video formats.
        assert!(meta.formats.iter().all(|f| f.format_id != "140"));
        // Synthetic entry carries the estimated size.
        assert_eq!(meta.formats[3].size_bytes, Some(1_440_000));
    }

    #[test]
    fn parse_metadata_handles_sparse_documents() {
        let meta = parse_metadata(&serde_json::json!({}));
        assert_eq!(meta.title, "Unknown");
        assert_eq!(meta.formats.len(), 1); // synthetic audio only
        assert!(meta.duration_secs.is_none());
    }
}
