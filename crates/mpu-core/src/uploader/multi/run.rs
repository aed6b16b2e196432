//! Multi event loop: perform, wait, messages; process completed handles and
//! refill free slots until the pending queue drains or the session fails.

use std::collections::VecDeque;
use std::time::Duration;

use crate::api::{CompletedPart, StorageApi};
use crate::control::AbortHandle;
use crate::planner::Part;
use crate::progress::{ProgressLedger, ProgressSnapshot};
use crate::source::ChunkSource;

use super::super::{PartError, RunError, SessionIds};
use super::refill::{self, ActiveItem};
use super::result;

const WAIT_TIMEOUT: Duration = Duration::from_millis(100);

/// Run all parts through one multi handle with at most `width` concurrent
/// transfers. The first part failure re-queues the part, cancels the rest
/// and terminates the run; an abort request cancels every active slot.
pub(in crate::uploader) fn run_multi(
    api: &dyn StorageApi,
    ids: &SessionIds,
    source: &ChunkSource,
    parts: Vec<Part>,
    width: usize,
    ledger: &mut ProgressLedger,
    abort: &AbortHandle,
    on_progress: &mut dyn FnMut(ProgressSnapshot),
) -> Result<Vec<CompletedPart>, RunError> {
    let multi = curl::multi::Multi::new();
    let mut pending: VecDeque<Part> = parts.into_iter().collect();
    let mut active: Vec<ActiveItem> = Vec::new();
    let mut completed: Vec<CompletedPart> = Vec::new();
    let mut first_error: Option<(u32, PartError)> = None;
    let mut aborted = false;
    let in_flight = ledger.counters();

    if let Some(failure) = refill::refill_active(
        &multi, api, ids, source, &in_flight, width, &mut active, &mut pending,
    ) {
        pending.push_back(failure.part);
        first_error = Some((failure.part.number, failure.error));
    }

    while !active.is_empty() && first_error.is_none() {
        if abort.is_aborted() {
            aborted = true;
            break;
        }

        let running = match multi.perform() {
            Ok(n) => n,
            Err(e) => {
                // perform failures carry no per-part attribution; charged to
                // the oldest active slot.
                let part = active[0].1;
                first_error = Some((part.number, PartError::Engine(e)));
                break;
            }
        };

        let mut done: Vec<(usize, Option<curl::Error>)> = Vec::new();
        multi.messages(|msg| {
            for (i, (handle, _)) in active.iter().enumerate() {
                if let Some(result) = msg.result_for2(handle) {
                    done.push((i, result.err()));
                    break;
                }
            }
        });
        done.sort_by(|a, b| b.0.cmp(&a.0));
        for (i, transport) in done {
            let (handle, part) = active.remove(i);
            ledger.fold_slot(part.number);
            let mut easy = match multi.remove2(handle) {
                Ok(easy) => easy,
                Err(e) => {
                    pending.push_back(part);
                    if first_error.is_none() {
                        first_error = Some((part.number, PartError::Engine(e)));
                    }
                    continue;
                }
            };
            let code = easy.response_code().unwrap_or(0);
            match result::part_result(code, transport, &part, easy.get_mut()) {
                Ok(done_part) => {
                    tracing::debug!(part = part.number, "part uploaded");
                    completed.push(done_part);
                }
                Err(error) => {
                    // One-shot policy: back to pending, fail the session.
                    pending.push_back(part);
                    if first_error.is_none() {
                        tracing::warn!(part = part.number, error = %error, "part failed");
                        first_error = Some((part.number, error));
                    }
                }
            }
        }

        if first_error.is_none() && !abort.is_aborted() {
            if let Some(failure) = refill::refill_active(
                &multi, api, ids, source, &in_flight, width, &mut active, &mut pending,
            ) {
                pending.push_back(failure.part);
                first_error = Some((failure.part.number, failure.error));
            }
        }

        ledger.emit_if_changed(on_progress);

        if first_error.is_some() {
            break;
        }
        if running > 0 {
            if let Err(e) = multi.wait(&mut [], WAIT_TIMEOUT) {
                let part = active[0].1;
                first_error = Some((part.number, PartError::Engine(e)));
                break;
            }
        }
    }

    // Teardown: cancel whatever is still active (abort or first-error exit).
    let cancelled = active.len();
    for (handle, part) in active.drain(..) {
        ledger.fold_slot(part.number);
        let _ = multi.remove2(handle);
    }
    ledger.emit_if_changed(on_progress);

    if aborted || abort.is_aborted() {
        tracing::info!(cancelled, "upload aborted; active transfers cancelled");
        return Err(RunError::Aborted { cancelled });
    }
    if let Some((part_number, error)) = first_error {
        return Err(RunError::Part { part_number, error });
    }
    Ok(completed)
}
