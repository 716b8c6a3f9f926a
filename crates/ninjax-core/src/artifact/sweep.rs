//! Time-bounded storage reclamation.
//!
//! `sweep` deletes files strictly older than a tier's retention age. A file
//! that fails to delete is logged and skipped; the rest of the pass
//! continues. `run_sweeper` runs one eager pass at startup and then loops
//! on a fixed interval, independent of request traffic. Races with an
//! in-flight serve are benign: the reader sees the file as gone and the
//! request ends in 404 ("expired").

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

/// One directory + retention pair the sweeper watches.
#[derive(Debug, Clone)]
pub struct SweepTier {
    pub dir: PathBuf,
    pub max_age: Duration,
}

/// Removes every regular file in `dir` whose age relative to `now` strictly
/// exceeds `max_age`. A file aged exactly `max_age` survives.
pub fn sweep(dir: &Path, now: SystemTime, max_age: Duration) -> SweepStats {
    let mut stats = SweepStats::default();
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "sweep cannot list directory");
            return stats;
        }
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let meta = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        stats.scanned += 1;

        let modified = meta.modified().unwrap_or(now);
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age <= max_age {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                stats.removed += 1;
                tracing::info!(file = %path.display(), age_secs = age.as_secs(), "expired file removed");
            }
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(file = %path.display(), error = %e, "failed to remove expired file");
            }
        }
    }
    stats
}

/// Background reclamation loop: eager pass, then one pass per interval.
/// Spawn with `tokio::spawn` and abort the handle on shutdown.
pub async fn run_sweeper(tiers: Vec<SweepTier>, interval: Duration) {
    loop {
        for tier in &tiers {
            let stats = sweep(&tier.dir, SystemTime::now(), tier.max_age);
            if stats.removed > 0 || stats.failed > 0 {
                tracing::info!(
                    dir = %tier.dir.display(),
                    scanned = stats.scanned,
                    removed = stats.removed,
                    failed = stats.failed,
                    "sweep pass complete"
                );
            }
        }
        tokio::time::sleep(interval).await;
    }
}
