//! `mpu plan` – show the part plan for a file without uploading.

use anyhow::Result;
use mpu_core::config::MpuConfig;
use mpu_core::planner::plan_parts;
use mpu_core::source::ChunkSource;
use std::path::Path;

pub fn run_plan(cfg: &MpuConfig, path: &Path, chunk_size: Option<u64>) -> Result<()> {
    let source = ChunkSource::open(path)?;
    let chunk = chunk_size.unwrap_or(cfg.chunk_size).max(1);
    let parts = plan_parts(source.len(), chunk);

    println!(
        "{}: {} bytes, {} part(s) of up to {} bytes",
        source.file_name(),
        source.len(),
        parts.len(),
        chunk
    );
    for part in &parts {
        println!(
            "  part {:>4}  [{:>12}, {:>12})  {} bytes",
            part.number,
            part.start,
            part.end,
            part.len()
        );
    }
    Ok(())
}
