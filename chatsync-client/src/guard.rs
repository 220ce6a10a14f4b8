//! Busy guards: the only mutual-exclusion primitive the stores need.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Flag marking a store (or one reply bucket) as having a fetch in flight.
#[derive(Debug, Default, Clone)]
pub(crate) struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    /// Claims the flag, or returns `None` when a fetch is already in flight.
    pub(crate) fn try_acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(Arc::clone(&self.0)))
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the flag on drop, including when the owning future is dropped
/// mid-fetch.
#[derive(Debug)]
#[must_use = "the busy flag is released as soon as the guard is dropped"]
pub(crate) struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
