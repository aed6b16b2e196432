//! OS-thread backend: worker pool over a mutex-guarded part queue.
//!
//! Workers pop parts, fetch their signed URLs and run one blocking Easy
//! transfer each; results come back over a channel. The pending queue and
//! the result stream are the only shared state, and callbacks fire only from
//! the coordinating thread.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use crate::api::{CompletedPart, StorageApi};
use crate::control::AbortHandle;
use crate::planner::Part;
use crate::progress::{ProgressLedger, ProgressSnapshot};
use crate::source::ChunkSource;

use super::part::{self, PartResult};
use super::{PartError, RunError, SessionIds};

pub(super) fn run_threads(
    api: &dyn StorageApi,
    ids: &SessionIds,
    source: &ChunkSource,
    parts: Vec<Part>,
    width: usize,
    ledger: &mut ProgressLedger,
    abort: &AbortHandle,
    on_progress: &mut dyn FnMut(ProgressSnapshot),
) -> Result<Vec<CompletedPart>, RunError> {
    let count = parts.len();
    let work: Arc<Mutex<VecDeque<Part>>> = Arc::new(Mutex::new(parts.into_iter().collect()));
    // Set on the first failure so workers stop drawing new parts while the
    // failed part stays in the pending queue.
    let stop = Arc::new(AtomicBool::new(false));
    let in_flight = ledger.counters();
    let (tx, rx) = mpsc::channel::<(Part, PartResult)>();
    let num_workers = width.min(count);

    let mut completed: Vec<CompletedPart> = Vec::with_capacity(count);
    let mut first_error: Option<(u32, PartError)> = None;
    let mut cancelled = 0usize;

    std::thread::scope(|scope| {
        for _ in 0..num_workers {
            let work = Arc::clone(&work);
            let stop = Arc::clone(&stop);
            let in_flight = Arc::clone(&in_flight);
            let abort = abort.clone();
            let tx = tx.clone();
            scope.spawn(move || loop {
                if abort.is_aborted() || stop.load(Ordering::Relaxed) {
                    break;
                }
                let part = match work.lock().unwrap().pop_front() {
                    Some(part) => part,
                    None => break,
                };
                let result = match api.part_url(&ids.object_key, &ids.upload_id, part.number) {
                    Ok(signed) => {
                        part::upload_one_part(&signed.signed_url, &part, source, &in_flight, &abort)
                    }
                    Err(e) => Err(PartError::SignedUrl(e)),
                };
                let _ = tx.send((part, result));
            });
        }
        drop(tx);

        // Single control path: results and progress are processed here only.
        loop {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok((part, result)) => {
                    ledger.fold_slot(part.number);
                    match result {
                        Ok(done) => {
                            tracing::debug!(part = part.number, "part uploaded");
                            completed.push(done);
                        }
                        Err(PartError::Aborted) => cancelled += 1,
                        Err(error) => {
                            // One-shot policy: back to pending, fail the session.
                            work.lock().unwrap().push_back(part);
                            stop.store(true, Ordering::Relaxed);
                            if first_error.is_none() {
                                tracing::warn!(part = part.number, error = %error, "part failed");
                                first_error = Some((part.number, error));
                            }
                        }
                    }
                    ledger.emit_if_changed(on_progress);
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    ledger.emit_if_changed(on_progress);
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    });

    if abort.is_aborted() {
        tracing::info!(cancelled, "upload aborted; active transfers cancelled");
        return Err(RunError::Aborted { cancelled });
    }
    if let Some((part_number, error)) = first_error {
        return Err(RunError::Part { part_number, error });
    }
    Ok(completed)
}
