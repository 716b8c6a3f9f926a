//! Named policy functions for format ordering and size estimation.
//!
//! Kept explicit so the observable behavior does not depend on whichever
//! extraction backend is in use.

use super::{FormatDescriptor, MediaKind};

/// Assumed bitrate for the synthetic compressed-audio entry when the
/// platform reports no exact size.
pub const FALLBACK_AUDIO_KBPS: u64 = 192;

/// Selector expression for the synthetic audio entry.
pub const AUDIO_FORMAT_ID: &str = "bestaudio/best";

/// Estimated size in bytes for `duration` seconds at `kbps` kilobits/s.
/// Returns None when duration is unknown.
pub fn estimate_filesize(duration_secs: Option<u64>, kbps: u64) -> Option<u64> {
    duration_secs.map(|d| d * kbps * 1000 / 8)
}

/// Total quality order: vertical resolution for video, bitrate for audio,
/// both read from the leading digits of the quality label (`"720p"`,
/// `"128kbps"`). Unparseable labels rank lowest.
pub fn quality_rank(fmt: &FormatDescriptor) -> u64 {
    let digits: String = fmt.quality.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Sorts descriptors by descending quality rank. The sort is stable, so
/// equal ranks keep the extractor's first-seen order.
pub fn sort_formats(formats: &mut [FormatDescriptor]) {
    formats.sort_by_key(|f| std::cmp::Reverse(quality_rank(f)));
}

/// The synthetic "best audio, as mp3" entry appended to every format list.
pub fn synthetic_audio(duration_secs: Option<u64>) -> FormatDescriptor {
    FormatDescriptor {
        format_id: AUDIO_FORMAT_ID.to_string(),
        quality: "MP3".to_string(),
        size_bytes: estimate_filesize(duration_secs, FALLBACK_AUDIO_KBPS),
        ext: "mp3".to_string(),
        kind: MediaKind::Audio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, quality: &str) -> FormatDescriptor {
        FormatDescriptor {
            format_id: id.to_string(),
            quality: quality.to_string(),
            size_bytes: None,
            ext: "mp4".to_string(),
            kind: MediaKind::Video,
        }
    }

    #[test]
    fn estimate_uses_duration_and_bitrate() {
        // 60s at 192 kbps = 60 * 192_000 / 8 bytes.
        assert_eq!(estimate_filesize(Some(60), FALLBACK_AUDIO_KBPS), Some(1_440_000));
        assert_eq!(estimate_filesize(None, FALLBACK_AUDIO_KBPS), None);
    }

    #[test]
    fn rank_reads_leading_digits() {
        assert_eq!(quality_rank(&video("a", "1080p")), 1080);
        assert_eq!(quality_rank(&video("a", "720p60")), 720);
        assert_eq!(quality_rank(&video("a", "unknown")), 0);
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let mut formats = vec![
            video("first-360", "360p"),
            video("first-720", "720p"),
            video("second-360", "360p"),
            video("only-1080", "1080p"),
        ];
        sort_formats(&mut formats);
        let ids: Vec<&str> = formats.iter().map(|f| f.format_id.as_str()).collect();
        assert_eq!(ids, ["only-1080", "first-720", "first-360", "second-360"]);
    }

    #[test]
    fn synthetic_audio_shape() {
        let entry = synthetic_audio(Some(120));
        assert_eq!(entry.format_id, AUDIO_FORMAT_ID);
        assert_eq!(entry.quality, "MP3");
        assert_eq!(entry.ext, "mp3");
        assert_eq!(entry.kind, MediaKind::Audio);
        assert_eq!(entry.size_bytes, Some(2_880_000));
        assert_eq!(synthetic_audio(None).size_bytes, None);
    }
}
