//! Easy2 Handler for a single part in the curl multi backend.
//! Streams the part's byte range from the source and captures response
//! headers for the ETag.

use std::str;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::planner::Part;
use crate::source::ChunkSource;

use super::super::part::find_etag;

/// Handler state for one part transfer. Implements curl's Handler for Easy2.
pub(super) struct PartHandler {
    part: Part,
    source: ChunkSource,
    response_headers: Vec<String>,
    cursor: u64,
    read_error: Option<std::io::Error>,
    in_flight: Arc<Vec<AtomicU64>>,
}

impl PartHandler {
    pub(super) fn new(part: Part, source: ChunkSource, in_flight: Arc<Vec<AtomicU64>>) -> Self {
        Self {
            part,
            source,
            response_headers: Vec::new(),
            cursor: 0,
            read_error: None,
            in_flight,
        }
    }

    /// Bytes handed to curl so far.
    pub(super) fn bytes_sent(&self) -> u64 {
        self.cursor
    }

    /// ETag header of the final response, quotes stripped.
    pub(super) fn etag(&self) -> Option<String> {
        find_etag(&self.response_headers)
    }

    pub(super) fn take_read_error(&mut self) -> Option<std::io::Error> {
        self.read_error.take()
    }
}

impl curl::easy::Handler for PartHandler {
    fn read(&mut self, data: &mut [u8]) -> Result<usize, curl::easy::ReadError> {
        let remaining = self.part.len().saturating_sub(self.cursor);
        if remaining == 0 {
            return Ok(0);
        }
        let want = (data.len() as u64).min(remaining) as usize;
        match self.source.read_at(self.part.start + self.cursor, &mut data[..want]) {
            // EOF short of the planned range surfaces as PartialTransfer.
            Ok(0) => Ok(0),
            Ok(n) => {
                self.cursor += n as u64;
                if let Some(counter) = self.in_flight.get(self.part.number as usize - 1) {
                    counter.store(self.cursor, Ordering::Relaxed);
                }
                Ok(n)
            }
            Err(e) => {
                self.read_error = Some(e);
                Err(curl::easy::ReadError::Abort)
            }
        }
    }

    fn header(&mut self, data: &[u8]) -> bool {
        if let Ok(s) = str::from_utf8(data) {
            let line = s.trim_end();
            if line.starts_with("HTTP/") {
                self.response_headers.clear();
            }
            self.response_headers.push(line.to_string());
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
        // Response body (error payloads) is irrelevant; drain it.
        Ok(data.len())
    }
}
