//! `mpu upload` – upload a file through the multipart API.

use anyhow::{Context, Result};
use mpu_core::api::HttpStorageApi;
use mpu_core::config::MpuConfig;
use mpu_core::control::AbortHandle;
use mpu_core::progress::ProgressSnapshot;
use mpu_core::session::upload_with_progress;
use mpu_core::source::ChunkSource;
use std::path::Path;
use std::time::Instant;
use url::Url;

pub async fn run_upload(
    cfg: &MpuConfig,
    path: &Path,
    chunk_size: Option<u64>,
    threads: Option<usize>,
    api_base: Option<String>,
) -> Result<()> {
    let mut cfg = cfg.clone();
    if let Some(chunk) = chunk_size {
        cfg.chunk_size = chunk;
    }
    if let Some(threads) = threads {
        cfg.threads_quantity = threads;
    }
    if let Some(base) = api_base {
        cfg.api_base = base;
    }

    let source = ChunkSource::open(path)?;
    let total = source.len();
    let base = Url::parse(&cfg.api_base)
        .with_context(|| format!("invalid api_base: {}", cfg.api_base))?;
    let api = HttpStorageApi::new(base);

    // Ctrl-C cancels the session; parts already stored remain on the remote
    // service.
    let abort = AbortHandle::new();
    let ctrl_c_abort = abort.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received; aborting upload");
            ctrl_c_abort.abort();
        }
    });

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<ProgressSnapshot>(16);
    const PROGRESS_INTERVAL_MS: u64 = 500;
    let printer = tokio::spawn(async move {
        let mut last_print = Instant::now();
        while let Some(snap) = progress_rx.recv().await {
            let now = Instant::now();
            if now.duration_since(last_print).as_millis() as u64 >= PROGRESS_INTERVAL_MS
                || snap.sent >= snap.total
            {
                let sent_mib = snap.sent as f64 / 1_048_576.0;
                let total_mib = snap.total as f64 / 1_048_576.0;
                println!(
                    "\r  {:.1} / {:.1} MiB ({}%)  ",
                    sent_mib, total_mib, snap.percentage
                );
                last_print = now;
            }
        }
    });

    let response = upload_with_progress(api, source, &cfg, Some(progress_tx), abort).await?;
    let _ = printer.await;

    println!("Uploaded {} bytes.", total);
    if let Some(location) = response.response.location {
        println!("Object location: {}", location);
    } else if let Some(key) = response.response.key {
        println!("Object key: {}", key);
    }
    Ok(())
}
