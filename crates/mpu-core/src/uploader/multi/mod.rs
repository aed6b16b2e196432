//! Curl multi backend: single-threaded event loop, multiple Easy2 handles.
//!
//! Drives part PUTs through one `curl::multi` handle. The pending queue,
//! active slots and progress ledger are touched only from this loop, so no
//! further locking is needed.

mod handler;
mod refill;
mod result;
mod run;

pub(super) use run::run_multi;
