//! Shared server state: explicitly constructed, dependency-injected
//! services. No ambient globals; everything the handlers touch hangs off
//! an `Arc<AppState>`.

use crate::ratelimit::RouteBudgets;
use anyhow::{Context, Result};
use ninjax_core::artifact::ArtifactStore;
use ninjax_core::config::GatewayConfig;
use ninjax_core::credentials::CookieStore;
use ninjax_core::dispatch::Dispatcher;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub struct AppState {
    pub cfg: GatewayConfig,
    pub dispatcher: Dispatcher,
    pub cookies: CookieStore,
    pub artifacts: ArtifactStore,
    /// Scratch dir extractors write into; swept on the long tier.
    pub temp_dir: PathBuf,
    pub budgets: RouteBudgets,
    /// Bounded worker pool for extractor subprocess calls. Keeps the
    /// request-accepting path responsive while probes/fetches block on
    /// network I/O.
    pub fetch_slots: Semaphore,
}

impl AppState {
    pub fn build(cfg: GatewayConfig) -> Result<Arc<Self>> {
        let paths = cfg.storage_paths()?;
        std::fs::create_dir_all(&paths.temp)
            .with_context(|| format!("creating temp dir {}", paths.temp.display()))?;

        let artifacts = ArtifactStore::new(&paths.downloads, &cfg.artifact_prefix)
            .with_context(|| format!("opening storage root {}", paths.downloads.display()))?;
        let cookies = CookieStore::new(paths.cookies.clone())
            .with_context(|| format!("opening cookie dir {}", paths.cookies.display()))?;
        let dispatcher = Dispatcher::build(&cfg);
        let budgets = RouteBudgets::new(&cfg.rate);
        let fetch_slots = Semaphore::new(cfg.fetch_slots.max(1));

        Ok(Arc::new(Self {
            cfg,
            dispatcher,
            cookies,
            artifacts,
            temp_dir: paths.temp,
            budgets,
            fetch_slots,
        }))
    }
}
