//! `mpu config` – print the resolved configuration and its file path.

use anyhow::Result;
use mpu_core::config::{self, MpuConfig};

pub fn run_config(cfg: &MpuConfig) -> Result<()> {
    let path = config::config_path()?;
    println!("config file: {}", path.display());
    println!("api_base         = {}", cfg.api_base);
    println!("chunk_size       = {} bytes", cfg.chunk_size);
    println!(
        "threads_quantity = {} (effective {})",
        cfg.threads_quantity,
        cfg.effective_width()
    );
    println!("backend          = {:?}", cfg.backend());
    Ok(())
}
