//! Page Scroll Lock
//!
//! While the checkout overlay is open the page behind it must not scroll.
//! The lock is held through a [`ScrollLockGuard`], so it is released on every
//! exit path: an explicit close, a re-open that replaces the flow, or the
//! controller simply being dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Page-level scroll lock owned by the presentation layer
pub trait ScrollLock: Send + Sync {
    /// Stop background scrolling
    fn acquire(&self);

    /// Restore background scrolling
    fn release(&self);
}

/// Holds the scroll lock until dropped
pub struct ScrollLockGuard {
    lock: Arc<dyn ScrollLock>,
}

impl ScrollLockGuard {
    pub fn acquire(lock: Arc<dyn ScrollLock>) -> Self {
        lock.acquire();
        tracing::debug!("Page scroll locked");
        Self { lock }
    }
}

impl Drop for ScrollLockGuard {
    fn drop(&mut self) {
        self.lock.release();
        tracing::debug!("Page scroll released");
    }
}

impl std::fmt::Debug for ScrollLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollLockGuard").finish_non_exhaustive()
    }
}

/// Scroll lock that counts holders
///
/// The page is locked while at least one holder exists. Running totals make
/// acquire/release pairing observable.
#[derive(Debug, Default)]
pub struct CountingScrollLock {
    holders: AtomicUsize,
    acquisitions: AtomicUsize,
    releases: AtomicUsize,
}

impl CountingScrollLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.holders.load(Ordering::SeqCst) > 0
    }

    pub fn holders(&self) -> usize {
        self.holders.load(Ordering::SeqCst)
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl ScrollLock for CountingScrollLock {
    fn acquire(&self) {
        self.holders.fetch_add(1, Ordering::SeqCst);
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        // saturate so an unpaired release cannot wrap
        let _ = self
            .holders
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}
