//! Single-part PUT to a pre-signed URL (blocking Easy handle).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::{normalize_etag, CompletedPart};
use crate::control::AbortHandle;
use crate::planner::Part;
use crate::source::ChunkSource;

use super::PartError;

/// Result of a single part transfer.
pub(super) type PartResult = Result<CompletedPart, PartError>;

/// Uploads one part: PUT the part's byte range to `signed_url`, capture the
/// ETag response header, and require status 200 exactly.
///
/// `in_flight[part.number - 1]` tracks bytes handed to curl so the
/// coordinator can aggregate in-flight progress; the counter is left at its
/// final value for the coordinator to fold.
pub(super) fn upload_one_part(
    signed_url: &str,
    part: &Part,
    source: &ChunkSource,
    in_flight: &Arc<Vec<AtomicU64>>,
    abort: &AbortHandle,
) -> PartResult {
    let part = *part;
    let cursor = Arc::new(AtomicU64::new(0));
    let cursor_cb = Arc::clone(&cursor);
    let read_error: Arc<Mutex<Option<std::io::Error>>> = Arc::new(Mutex::new(None));
    let read_error_cb = Arc::clone(&read_error);
    let headers: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let headers_cb = Arc::clone(&headers);
    let counters = Arc::clone(in_flight);
    let counter_idx = part.number as usize - 1;
    let source = source.clone();
    let abort_cb = abort.clone();

    let mut easy = curl::easy::Easy::new();
    easy.url(signed_url).map_err(PartError::Curl)?;
    easy.upload(true).map_err(PartError::Curl)?;
    easy.in_filesize(part.len()).map_err(PartError::Curl)?;
    easy.connect_timeout(Duration::from_secs(30))
        .map_err(PartError::Curl)?;
    // Give up if throughput drops below 1 KiB/s for 60s rather than holding
    // a slot on a dead link.
    easy.low_speed_limit(1024).map_err(PartError::Curl)?;
    easy.low_speed_time(Duration::from_secs(60))
        .map_err(PartError::Curl)?;
    // Hard ceiling matching the signed URL validity window.
    easy.timeout(Duration::from_secs(3600))
        .map_err(PartError::Curl)?;
    easy.progress(true).map_err(PartError::Curl)?;

    {
        let mut transfer = easy.transfer();
        transfer
            .read_function(move |buf| {
                let sent = cursor_cb.load(Ordering::Relaxed);
                let remaining = part.len().saturating_sub(sent);
                if remaining == 0 {
                    return Ok(0);
                }
                let want = (buf.len() as u64).min(remaining) as usize;
                match source.read_at(part.start + sent, &mut buf[..want]) {
                    // EOF short of the planned range surfaces as PartialTransfer.
                    Ok(0) => Ok(0),
                    Ok(n) => {
                        let now = sent + n as u64;
                        cursor_cb.store(now, Ordering::Relaxed);
                        if let Some(counter) = counters.get(counter_idx) {
                            counter.store(now, Ordering::Relaxed);
                        }
                        Ok(n)
                    }
                    Err(e) => {
                        let _ = read_error_cb.lock().unwrap().replace(e);
                        Err(curl::easy::ReadError::Abort)
                    }
                }
            })
            .map_err(PartError::Curl)?;
        transfer
            .header_function(move |data| {
                if let Ok(s) = std::str::from_utf8(data) {
                    let line = s.trim_end();
                    let mut headers = headers_cb.lock().unwrap();
                    if line.starts_with("HTTP/") {
                        headers.clear();
                    }
                    headers.push(line.to_string());
                }
                true
            })
            .map_err(PartError::Curl)?;
        // Response body (error payloads) is irrelevant; drain it.
        transfer
            .write_function(|data| Ok(data.len()))
            .map_err(PartError::Curl)?;
        transfer
            .progress_function(move |_, _, _, _| !abort_cb.is_aborted())
            .map_err(PartError::Curl)?;

        if let Err(e) = transfer.perform() {
            if let Some(io_err) = read_error.lock().unwrap().take() {
                return Err(PartError::Source(io_err));
            }
            if e.is_aborted_by_callback() && abort.is_aborted() {
                return Err(PartError::Aborted);
            }
            return Err(PartError::Curl(e));
        }
    }

    let code = easy.response_code().map_err(PartError::Curl)?;
    if code != 200 {
        return Err(PartError::Http(code));
    }
    let sent = cursor.load(Ordering::Relaxed);
    if sent != part.len() {
        return Err(PartError::PartialTransfer {
            expected: part.len(),
            sent,
        });
    }
    let headers = headers.lock().unwrap();
    match find_etag(&headers) {
        Some(etag) => Ok(CompletedPart {
            part_number: part.number,
            etag,
        }),
        None => Err(PartError::MissingEtag),
    }
}

/// First ETag header value in `headers`, quotes stripped.
pub(super) fn find_etag(headers: &[String]) -> Option<String> {
    headers.iter().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("etag") {
            Some(normalize_etag(value))
        } else {
            None
        }
    })
}
