use std::sync::atomic::{AtomicBool, Ordering};

/// One-at-a-time latch for the session-expiry redirect.
///
/// Taken with a compare-exchange before any side effect; released when the
/// returned permit is dropped. While it is held, other 401s do nothing.
#[derive(Debug, Default)]
pub struct RedirectGuard {
    active: AtomicBool,
}

#[must_use = "the guard is released as soon as the permit is dropped"]
pub struct RedirectPermit<'a> {
    guard: &'a RedirectGuard,
}

impl RedirectGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> Option<RedirectPermit<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RedirectPermit { guard: self })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for RedirectPermit<'_> {
    fn drop(&mut self) {
        self.guard.active.store(false, Ordering::Release);
    }
}
