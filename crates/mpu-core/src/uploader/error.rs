//! Part transfer error type.

use std::fmt;

/// Error from a single part transfer: the signed-URL fetch, the curl
/// transfer itself, the HTTP status, or reading the source file.
/// The session's one-shot policy turns the first of these into the terminal
/// session error; nothing here is retried.
#[derive(Debug)]
pub enum PartError {
    /// Curl reported a transport error (timeout, connection, TLS, ...).
    Curl(curl::Error),
    /// The curl multi interface itself failed while this part was active.
    Engine(curl::MultiError),
    /// Signed-URL target answered with a status other than 200.
    Http(u32),
    /// 200 response without an ETag header; the part cannot be finalized.
    MissingEtag,
    /// Transfer ended with fewer bytes sent than the part length
    /// (e.g. the server closed early or the file shrank mid-upload).
    PartialTransfer { expected: u64, sent: u64 },
    /// Reading the source file failed.
    Source(std::io::Error),
    /// Fetching the signed URL from the control plane failed.
    SignedUrl(anyhow::Error),
    /// The transfer was cancelled by an abort request.
    Aborted,
}

impl fmt::Display for PartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartError::Curl(e) => write!(f, "{}", e),
            PartError::Engine(e) => write!(f, "transfer engine: {}", e),
            PartError::Http(code) => write!(f, "HTTP {}", code),
            PartError::MissingEtag => write!(f, "response carried no ETag header"),
            PartError::PartialTransfer { expected, sent } => {
                write!(f, "partial transfer: expected {} bytes, sent {}", expected, sent)
            }
            PartError::Source(e) => write!(f, "source read: {}", e),
            PartError::SignedUrl(e) => write!(f, "signed URL request: {:#}", e),
            PartError::Aborted => write!(f, "transfer cancelled"),
        }
    }
}

impl std::error::Error for PartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PartError::Curl(e) => Some(e),
            PartError::Engine(e) => Some(e),
            PartError::Source(e) => Some(e),
            PartError::SignedUrl(e) => Some(e.as_ref()),
            PartError::Http(_)
            | PartError::MissingEtag
            | PartError::PartialTransfer { .. }
            | PartError::Aborted => None,
        }
    }
}
