//! Cooperative abort for a running upload session.
//!
//! The session hands out a cloneable [`AbortHandle`]; the transfer engine
//! checks the shared flag between transfer events, cancels active slots and
//! discards pending parts. Already-uploaded parts are not rolled back on the
//! remote service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle requesting cancellation of a running session.
///
/// A session already in a terminal state ignores the request.
#[derive(Clone, Debug, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
