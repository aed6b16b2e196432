use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Default part size: 5 MiB (the smallest part most providers accept for
/// non-terminal parts).
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;
/// Default number of concurrent part transfers.
pub const DEFAULT_THREADS_QUANTITY: usize = 5;
/// Hard cap on concurrent part transfers, regardless of configuration.
pub const MAX_THREADS_QUANTITY: usize = 15;

/// Transfer backend: curl multi (single-threaded event loop, multiple Easy2
/// handles) or worker threads (one Easy handle per active part).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadBackend {
    #[default]
    Multi,
    Threads,
}

/// Global configuration loaded from `~/.config/mpu/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpuConfig {
    /// Base URL of the upload API (the service exposing the three multipart
    /// endpoints).
    pub api_base: String,
    /// Part size in bytes.
    pub chunk_size: u64,
    /// Concurrent part transfers (capped at `MAX_THREADS_QUANTITY`).
    pub threads_quantity: usize,
    /// Transfer backend: "multi" (default) or "threads".
    #[serde(default)]
    pub backend: Option<UploadBackend>,
}

impl Default for MpuConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:3000/api/".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            threads_quantity: DEFAULT_THREADS_QUANTITY,
            backend: None,
        }
    }
}

impl MpuConfig {
    /// Effective concurrency width: clamped to `1..=MAX_THREADS_QUANTITY`
    /// regardless of the configured value.
    pub fn effective_width(&self) -> usize {
        self.threads_quantity.clamp(1, MAX_THREADS_QUANTITY)
    }

    /// Effective part size: at least one byte.
    pub fn effective_chunk_size(&self) -> u64 {
        self.chunk_size.max(1)
    }

    pub fn backend(&self) -> UploadBackend {
        self.backend.unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mpu")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MpuConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MpuConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: MpuConfig = toml::from_str(&data)?;
    Ok(cfg)
}
