use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide mutual exclusion over the leave store and the active
/// index. Acquisition never blocks: callers that lose either skip their
/// cycle (pollers) or enqueue the event (callback handler).
#[derive(Debug, Default)]
pub struct SyncLock {
    held: AtomicBool,
}

impl SyncLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to take the gate; returns a releasing guard on success.
    pub fn try_acquire(&self) -> Option<SyncGuard<'_>> {
        if self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Some(SyncGuard { lock: self })
        } else {
            None
        }
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Releases the lock on drop, so early returns inside a cycle cannot
/// leave the gate stuck.
pub struct SyncGuard<'a> {
    lock: &'a SyncLock,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}
