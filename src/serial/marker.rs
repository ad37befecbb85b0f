//! Operator marker flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single pending-marker flag shared between the operator and the reader
/// thread.
///
/// Arming twice before the next batch still yields one marker.
#[derive(Debug, Clone, Default)]
pub struct MarkerGate {
    pending: Arc<AtomicBool>,
}

impl MarkerGate {
    /// Unarmed gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a marker on the next processed sample.
    pub fn arm(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Consume the pending marker, if any.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Whether a marker is waiting.
    pub fn is_armed(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Drop a pending marker.
    pub fn clear(&self) {
        self.pending.store(false, Ordering::Release);
    }
}
