//! Upload session orchestration.
//!
//! Owns the lifecycle of one file transfer: create the remote session, plan
//! parts, drain them through the transfer engine, then finalize with the
//! completed parts sorted ascending. Exactly one terminal hook fires per
//! session: `on_complete` or `on_error`, never both.

mod error;
mod run_async;

pub use error::UploadError;
pub use run_async::upload_with_progress;

use crate::api::{CompleteResponse, StorageApi};
use crate::config::MpuConfig;
use crate::control::AbortHandle;
use crate::planner::plan_parts;
use crate::progress::{ProgressLedger, ProgressSnapshot};
use crate::source::ChunkSource;
use crate::uploader::{self, RunError, SessionIds};

/// Lifecycle of one upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Planning,
    Running,
    Completing,
    Done,
    Failed,
    Aborted,
}

type ProgressHook = Box<dyn FnMut(ProgressSnapshot) + Send>;
type CompleteHook = Box<dyn FnOnce(CompleteResponse) + Send>;
type ErrorHook = Box<dyn FnOnce(UploadError) + Send>;

/// One multipart upload session.
///
/// Hooks default to doing nothing; register them before `start`. `start`
/// drives the session to a terminal state on the calling thread; use
/// [`upload_with_progress`] for an async wrapper, and [`Uploader::abort_handle`]
/// to cancel from another thread.
pub struct Uploader<A: StorageApi> {
    api: A,
    source: ChunkSource,
    chunk_size: u64,
    width: usize,
    backend: crate::config::UploadBackend,
    state: SessionState,
    abort: AbortHandle,
    on_progress: Option<ProgressHook>,
    on_complete: Option<CompleteHook>,
    on_error: Option<ErrorHook>,
}

impl<A: StorageApi> Uploader<A> {
    pub fn new(api: A, source: ChunkSource, config: &MpuConfig) -> Self {
        Self {
            api,
            source,
            chunk_size: config.effective_chunk_size(),
            width: config.effective_width(),
            backend: config.backend(),
            state: SessionState::Idle,
            abort: AbortHandle::new(),
            on_progress: None,
            on_complete: None,
            on_error: None,
        }
    }

    /// Progress hook, called synchronously from the engine's control path
    /// whenever the aggregate snapshot changes.
    pub fn on_progress(mut self, hook: impl FnMut(ProgressSnapshot) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(hook));
        self
    }

    /// Success hook: the provider's finalize response. Fires at most once.
    pub fn on_complete(mut self, hook: impl FnOnce(CompleteResponse) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    /// Failure hook: the first unrecovered error. Fires at most once and
    /// overrides any progress reported before it.
    pub fn on_error(mut self, hook: impl FnOnce(UploadError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    /// Replace the session's abort token (e.g. to share one across sessions).
    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    /// Handle for cancelling the session from another thread.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to a terminal state. Blocks the calling thread; all
    /// hooks fire on it. Returns the terminal state for convenience.
    pub fn start(mut self) -> SessionState {
        if self.abort.is_aborted() {
            return self.fail(UploadError::Cancelled { cancelled_parts: 0 });
        }

        self.state = SessionState::Planning;
        let filename = self.source.file_name();
        let ids = match self.api.create_upload(&filename) {
            Ok(created) => SessionIds {
                upload_id: created.upload_id,
                object_key: created.object_key,
            },
            Err(e) => return self.fail(UploadError::SessionCreation(e)),
        };

        let parts = plan_parts(self.source.len(), self.chunk_size);
        tracing::info!(
            key = %ids.object_key,
            upload_id = %ids.upload_id,
            parts = parts.len(),
            size = self.source.len(),
            "multipart session created"
        );

        self.state = SessionState::Running;
        let mut ledger = ProgressLedger::new(self.source.len(), parts.len());
        let mut on_progress = self.on_progress.take();
        let outcome = uploader::run_parts(
            &self.api,
            &ids,
            &self.source,
            parts,
            self.width,
            self.backend,
            &mut ledger,
            &self.abort,
            &mut |snapshot| {
                if let Some(hook) = on_progress.as_mut() {
                    hook(snapshot);
                }
            },
        );

        match outcome {
            Ok(mut completed) => {
                self.state = SessionState::Completing;
                // The remote service requires ascending part order; the
                // engine returns completion order.
                completed.sort_by_key(|p| p.part_number);
                match self
                    .api
                    .complete_upload(&ids.object_key, &ids.upload_id, &completed)
                {
                    Ok(response) => {
                        self.state = SessionState::Done;
                        tracing::info!(key = %ids.object_key, "upload finalized");
                        if let Some(hook) = self.on_complete.take() {
                            hook(response);
                        }
                        SessionState::Done
                    }
                    Err(e) => self.fail(UploadError::Finalize(e)),
                }
            }
            Err(RunError::Part { part_number, error }) => self.fail(UploadError::PartTransfer {
                part_number,
                source: error,
            }),
            Err(RunError::Aborted { cancelled }) => self.fail(UploadError::Cancelled {
                cancelled_parts: cancelled,
            }),
        }
    }

    fn fail(&mut self, error: UploadError) -> SessionState {
        self.state = match error {
            UploadError::Cancelled { .. } => SessionState::Aborted,
            _ => SessionState::Failed,
        };
        tracing::warn!(error = %error, "upload session failed");
        if let Some(hook) = self.on_error.take() {
            hook(error);
        }
        self.state
    }
}
