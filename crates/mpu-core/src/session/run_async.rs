//! Async bridge: run the blocking session on the tokio blocking pool and
//! forward progress snapshots over a channel.

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};

use crate::api::{CompleteResponse, StorageApi};
use crate::config::MpuConfig;
use crate::control::AbortHandle;
use crate::progress::ProgressSnapshot;
use crate::source::ChunkSource;

use super::{UploadError, Uploader};

/// Uploads `source` through `api`, delivering progress snapshots to
/// `progress_tx` (dropped, not blocked on, when the receiver lags) and
/// returning the provider's finalize response.
///
/// `abort` cancels the session from any task or thread.
pub async fn upload_with_progress<A>(
    api: A,
    source: ChunkSource,
    config: &MpuConfig,
    progress_tx: Option<tokio::sync::mpsc::Sender<ProgressSnapshot>>,
    abort: AbortHandle,
) -> Result<CompleteResponse>
where
    A: StorageApi + 'static,
{
    let outcome: Arc<Mutex<Option<Result<CompleteResponse, UploadError>>>> =
        Arc::new(Mutex::new(None));
    let complete_slot = Arc::clone(&outcome);
    let error_slot = Arc::clone(&outcome);

    let mut uploader = Uploader::new(api, source, config)
        .with_abort(abort)
        .on_complete(move |response| {
            *complete_slot.lock().unwrap() = Some(Ok(response));
        })
        .on_error(move |error| {
            *error_slot.lock().unwrap() = Some(Err(error));
        });
    if let Some(tx) = progress_tx {
        uploader = uploader.on_progress(move |snapshot| {
            let _ = tx.try_send(snapshot);
        });
    }

    let state = tokio::task::spawn_blocking(move || uploader.start())
        .await
        .context("upload task join")?;

    let result = outcome.lock().unwrap().take();
    match result {
        Some(Ok(response)) => Ok(response),
        Some(Err(error)) => Err(anyhow::Error::new(error)),
        None => anyhow::bail!("session ended in state {:?} without a terminal callback", state),
    }
}
