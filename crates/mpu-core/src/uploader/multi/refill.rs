//! Refill helpers for the multi event loop: dispatch pending parts into free
//! slots up to the concurrency width.

use std::collections::VecDeque;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use crate::api::StorageApi;
use crate::planner::Part;
use crate::source::ChunkSource;

use super::super::{PartError, SessionIds};
use super::handler::PartHandler;

/// Active entry in the multi event loop: handle plus the part it serves.
pub(super) type ActiveItem = (curl::multi::Easy2Handle<PartHandler>, Part);

/// A part that could not be dispatched (signed-URL fetch or handle setup
/// failed); the caller re-queues it and fails the session.
pub(super) struct PartFailure {
    pub(super) part: Part,
    pub(super) error: PartError,
}

/// Fetch the part's signed URL and add a configured Easy2 handle for it to
/// the multi handle.
pub(super) fn add_part_to_multi(
    multi: &curl::multi::Multi,
    api: &dyn StorageApi,
    ids: &SessionIds,
    source: &ChunkSource,
    in_flight: &Arc<Vec<AtomicU64>>,
    part: Part,
) -> Result<curl::multi::Easy2Handle<PartHandler>, PartError> {
    let signed = api
        .part_url(&ids.object_key, &ids.upload_id, part.number)
        .map_err(PartError::SignedUrl)?;

    let handler = PartHandler::new(part, source.clone(), Arc::clone(in_flight));
    let mut easy = curl::easy::Easy2::new(handler);
    easy.url(&signed.signed_url).map_err(PartError::Curl)?;
    easy.upload(true).map_err(PartError::Curl)?;
    easy.in_filesize(part.len()).map_err(PartError::Curl)?;
    easy.connect_timeout(Duration::from_secs(30))
        .map_err(PartError::Curl)?;
    easy.low_speed_limit(1024).map_err(PartError::Curl)?;
    easy.low_speed_time(Duration::from_secs(60))
        .map_err(PartError::Curl)?;
    // Hard ceiling matching the signed URL validity window.
    easy.timeout(Duration::from_secs(3600))
        .map_err(PartError::Curl)?;

    multi.add2(easy).map_err(PartError::Engine)
}

/// Refill the active set from the pending queue until `width` is reached or
/// nothing is left to dispatch. Returns the first dispatch failure, if any;
/// remaining pending parts are left untouched.
pub(super) fn refill_active(
    multi: &curl::multi::Multi,
    api: &dyn StorageApi,
    ids: &SessionIds,
    source: &ChunkSource,
    in_flight: &Arc<Vec<AtomicU64>>,
    width: usize,
    active: &mut Vec<ActiveItem>,
    pending: &mut VecDeque<Part>,
) -> Option<PartFailure> {
    while active.len() < width {
        let Some(part) = pending.pop_front() else {
            break;
        };
        match add_part_to_multi(multi, api, ids, source, in_flight, part) {
            Ok(handle) => {
                tracing::debug!(part = part.number, len = part.len(), "part dispatched");
                active.push((handle, part));
            }
            Err(error) => return Some(PartFailure { part, error }),
        }
    }
    None
}
