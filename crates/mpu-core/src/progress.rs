//! Aggregate upload progress: completed bytes plus in-flight counters.
//!
//! The transfer engine updates one atomic counter per part while its slot is
//! active; when a slot closes (success, failure or cancellation) the counter
//! is folded exactly once into a running accumulator so later snapshots do
//! not double count.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot of aggregate upload progress delivered to the progress hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Bytes sent so far (closed slots plus in-flight counters), clamped to `total`.
    pub sent: u64,
    /// Total file size in bytes.
    pub total: u64,
    /// Rounded percentage in `0..=100`.
    pub percentage: u8,
}

/// Byte ledger for one session.
///
/// A re-queued part's already-folded bytes are not subtracted, so the
/// percentage is a best-effort indicator and can briefly overshoot across a
/// failed slot; the session is failing at that point and the terminal error
/// overrides any progress reported before it.
pub struct ProgressLedger {
    uploaded_size: u64,
    in_flight: Arc<Vec<AtomicU64>>,
    total: u64,
    last_emitted: Option<ProgressSnapshot>,
}

impl ProgressLedger {
    pub fn new(total: u64, part_count: usize) -> Self {
        let in_flight = Arc::new((0..part_count).map(|_| AtomicU64::new(0)).collect());
        Self {
            uploaded_size: 0,
            in_flight,
            total,
            last_emitted: None,
        }
    }

    /// Shared per-part counters, indexed by part number − 1. Active slots
    /// store the bytes they have sent so far.
    pub fn counters(&self) -> Arc<Vec<AtomicU64>> {
        Arc::clone(&self.in_flight)
    }

    /// Folds a closing slot's observed bytes into the accumulator and clears
    /// its counter.
    pub fn fold_slot(&mut self, part_number: u32) {
        if let Some(counter) = self.in_flight.get(part_number as usize - 1) {
            self.uploaded_size += counter.swap(0, Ordering::Relaxed);
        }
    }

    /// Current snapshot: folded bytes plus in-flight counters, clamped to total.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let in_flight: u64 = self.in_flight.iter().map(|c| c.load(Ordering::Relaxed)).sum();
        let sent = (self.uploaded_size + in_flight).min(self.total);
        ProgressSnapshot {
            sent,
            total: self.total,
            percentage: percentage(sent, self.total),
        }
    }

    /// Delivers the current snapshot through `sink` if it changed since the
    /// last delivery.
    pub fn emit_if_changed(&mut self, sink: &mut dyn FnMut(ProgressSnapshot)) {
        let snap = self.snapshot();
        if self.last_emitted != Some(snap) {
            self.last_emitted = Some(snap);
            sink(snap);
        }
    }
}

/// Rounded percentage. An empty file reports 100 so the degenerate
/// single-part session still terminates at a full bar.
fn percentage(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent as f64 / total as f64) * 100.0).round() as u8
}
