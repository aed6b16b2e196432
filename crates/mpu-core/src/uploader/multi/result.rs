//! Build the part result from a completed Easy2 transfer.

use crate::api::CompletedPart;
use crate::planner::Part;

use super::super::part::PartResult;
use super::super::PartError;
use super::handler::PartHandler;

/// Result from the response code, the transport outcome reported by the
/// multi handle, and the handler state. Success requires status 200 exactly,
/// a full-range transfer, and an ETag header.
pub(super) fn part_result(
    code: u32,
    transport: Option<curl::Error>,
    part: &Part,
    handler: &mut PartHandler,
) -> PartResult {
    if let Some(io_err) = handler.take_read_error() {
        return Err(PartError::Source(io_err));
    }
    if let Some(e) = transport {
        return Err(PartError::Curl(e));
    }
    if code != 200 {
        return Err(PartError::Http(code));
    }
    let sent = handler.bytes_sent();
    let expected = part.len();
    if sent != expected {
        return Err(PartError::PartialTransfer { expected, sent });
    }
    match handler.etag() {
        Some(etag) => Ok(CompletedPart {
            part_number: part.number,
            etag,
        }),
        None => Err(PartError::MissingEtag),
    }
}
