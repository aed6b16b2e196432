//! Remote multipart API client: session create, per-part signed URLs, finalize.
//!
//! The three control-plane operations are implemented by the upload service
//! sitting in front of the object store; the orchestrator only ever sees
//! opaque upload ids, object keys and pre-signed URLs.

mod http;
mod types;

pub use http::HttpStorageApi;
pub use types::{
    normalize_etag, CompleteResponse, CompletedPart, CreateUploadResponse, FinalizedObject,
    SignedUrlResponse,
};

use anyhow::Result;

/// Control-plane operations of the upload service.
///
/// Implementations must be shareable across threads: the threads backend
/// fetches signed URLs from its worker threads.
pub trait StorageApi: Send + Sync {
    /// Open a multipart session for `filename`. The service assigns the
    /// object key and upload id; both are opaque to the caller.
    fn create_upload(&self, filename: &str) -> Result<CreateUploadResponse>;

    /// Pre-signed single-part PUT URL for `part_number` (1-based).
    /// Valid for a bounded window (assume at most one hour).
    fn part_url(
        &self,
        object_key: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<SignedUrlResponse>;

    /// Finalize the upload. `parts` must be sorted ascending by part number;
    /// the service validates that every part is present with a matching tag.
    fn complete_upload(
        &self,
        object_key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<CompleteResponse>;
}
