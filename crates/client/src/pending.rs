//! In-flight request accounting for the stores' `loading` flags.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts one request as in flight until dropped.
pub(crate) struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    pub(crate) fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }

    /// Whether another request besides this one is still running.
    pub(crate) fn others_running(&self) -> bool {
        self.0.load(Ordering::Acquire) > 1
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
