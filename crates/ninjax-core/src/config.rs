use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Per-route rate budgets, requests per minute per client IP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConfig {
    pub analyze_per_minute: u32,
    pub download_per_minute: u32,
    pub cookies_per_minute: u32,
    pub files_per_minute: u32,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            analyze_per_minute: 10,
            download_per_minute: 5,
            cookies_per_minute: 5,
            files_per_minute: 60,
        }
    }
}

/// Retention tiers for the sweep loop, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Servable artifacts: short-lived.
    pub download_secs: u64,
    /// Extractor scratch files: longer-lived.
    pub temp_secs: u64,
    /// Interval between sweep passes.
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            download_secs: 3600,
            temp_secs: 86_400,
            sweep_interval_secs: 3600,
        }
    }
}

/// Storage directories. When unset, they resolve under the XDG state dir
/// (`~/.local/state/ninjax/{downloads,temp,cookies}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    #[serde(default)]
    pub cookie_dir: Option<PathBuf>,
}

/// Resolved storage layout: the three roles the gateway writes under.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub downloads: PathBuf,
    pub temp: PathBuf,
    pub cookies: PathBuf,
}

/// Global configuration loaded from `~/.config/ninjax/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Listen address. The `PORT` env var overrides the port part.
    pub bind_addr: String,
    /// Maximum accepted request body size in bytes (cookie uploads).
    pub max_body_bytes: usize,
    /// Extractor worker-pool size: concurrent probe/fetch subprocesses.
    pub fetch_slots: usize,
    /// Deadline for a metadata probe.
    pub probe_timeout_secs: u64,
    /// Deadline for a full media fetch.
    pub fetch_timeout_secs: u64,
    /// Prefix baked into every committed artifact filename.
    pub artifact_prefix: String,
    /// Name or path of the yt-dlp binary.
    pub ytdlp_bin: String,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub rate: RateConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            max_body_bytes: 100 * 1024 * 1024,
            fetch_slots: 10,
            probe_timeout_secs: 30,
            fetch_timeout_secs: 120,
            artifact_prefix: "Downloader_NinjaX".to_string(),
            ytdlp_bin: "yt-dlp".to_string(),
            storage: StorageConfig::default(),
            rate: RateConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Bind address with the `PORT` env override applied (deploy targets
    /// inject PORT rather than editing the config file).
    pub fn effective_bind(&self) -> String {
        match std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            Some(port) => {
                let host = self.bind_addr.rsplit_once(':').map(|(h, _)| h).unwrap_or("0.0.0.0");
                format!("{host}:{port}")
            }
            None => self.bind_addr.clone(),
        }
    }

    /// Resolve the three storage roles, falling back to the XDG state dir.
    pub fn storage_paths(&self) -> Result<StoragePaths> {
        let state_home = || -> Result<PathBuf> {
            Ok(xdg::BaseDirectories::with_prefix("ninjax")?.get_state_home())
        };
        let downloads = match &self.storage.download_dir {
            Some(p) => p.clone(),
            None => state_home()?.join("downloads"),
        };
        let temp = match &self.storage.temp_dir {
            Some(p) => p.clone(),
            None => state_home()?.join("temp"),
        };
        let cookies = match &self.storage.cookie_dir {
            Some(p) => p.clone(),
            None => state_home()?.join("cookies"),
        };
        Ok(StoragePaths {
            downloads,
            temp,
            cookies,
        })
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ninjax")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<GatewayConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = GatewayConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: GatewayConfig = toml::from_str(&data)?;
    Ok(cfg)
}
