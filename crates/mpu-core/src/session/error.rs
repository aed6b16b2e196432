//! Terminal session error taxonomy.

use std::fmt;

use crate::uploader::PartError;

/// The single terminal error a session can deliver through `on_error`.
///
/// Nothing here is retried; every variant ends the session. Parts already
/// stored remotely are not cleaned up (for `PartTransfer`, `Cancelled` and
/// `Finalize` they remain orphaned until removed out of band).
#[derive(Debug)]
pub enum UploadError {
    /// The create-upload call failed; no parts were attempted.
    SessionCreation(anyhow::Error),
    /// A part's signed-URL fetch or byte transfer failed. The part was
    /// returned to the pending set, but the session terminates anyway
    /// (one-shot-per-part policy).
    PartTransfer { part_number: u32, source: PartError },
    /// An abort request landed; `cancelled_parts` transfers were active and
    /// were cancelled.
    Cancelled { cancelled_parts: usize },
    /// Every part succeeded but the complete-upload call failed.
    Finalize(anyhow::Error),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::SessionCreation(e) => write!(f, "session creation failed: {:#}", e),
            UploadError::PartTransfer { part_number, source } => {
                write!(f, "part {} failed: {}", part_number, source)
            }
            UploadError::Cancelled { cancelled_parts } => {
                write!(f, "upload cancelled ({} active transfers aborted)", cancelled_parts)
            }
            UploadError::Finalize(e) => write!(f, "completing the upload failed: {:#}", e),
        }
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UploadError::SessionCreation(e) | UploadError::Finalize(e) => Some(e.as_ref()),
            UploadError::PartTransfer { source, .. } => Some(source),
            UploadError::Cancelled { .. } => None,
        }
    }
}
