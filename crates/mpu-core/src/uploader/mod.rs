//! Part transfer engine.
//!
//! Drains the planned part queue with a bounded number of concurrent PUTs
//! against pre-signed URLs. Two backends implement the same contract:
//! `multi` (single-threaded curl multi event loop, default) and `threads`
//! (worker threads over a mutex-guarded queue). Either way the first part
//! failure re-queues the part and terminates the run; nothing is retried.

mod error;
mod multi;
mod part;
mod threads;

pub use error::PartError;

use crate::api::{CompletedPart, StorageApi};
use crate::config::UploadBackend;
use crate::control::AbortHandle;
use crate::planner::Part;
use crate::progress::{ProgressLedger, ProgressSnapshot};
use crate::source::ChunkSource;

/// Identifiers of one remote multipart session.
#[derive(Debug, Clone)]
pub struct SessionIds {
    pub upload_id: String,
    pub object_key: String,
}

/// Terminal failure of the part-transfer phase.
#[derive(Debug)]
pub(crate) enum RunError {
    /// A part failed; the failed part was re-queued and the run stopped.
    Part { part_number: u32, error: PartError },
    /// An abort request landed while parts were active or pending.
    Aborted { cancelled: usize },
}

/// Uploads every planned part, bounded by `width` concurrent transfers.
///
/// Returns the completed parts in completion order (callers sort before
/// finalize). Progress snapshots are delivered through `on_progress` from
/// the calling thread only.
pub(crate) fn run_parts(
    api: &dyn StorageApi,
    ids: &SessionIds,
    source: &ChunkSource,
    parts: Vec<Part>,
    width: usize,
    backend: UploadBackend,
    ledger: &mut ProgressLedger,
    abort: &AbortHandle,
    on_progress: &mut dyn FnMut(ProgressSnapshot),
) -> Result<Vec<CompletedPart>, RunError> {
    if parts.is_empty() {
        return Ok(Vec::new());
    }
    if abort.is_aborted() {
        return Err(RunError::Aborted { cancelled: 0 });
    }
    let width = width.max(1);
    match backend {
        UploadBackend::Multi => {
            multi::run_multi(api, ids, source, parts, width, ledger, abort, on_progress)
        }
        UploadBackend::Threads => {
            threads::run_threads(api, ids, source, parts, width, ledger, abort, on_progress)
        }
    }
}
