//! Supersede-on-newer bookkeeping for long-latency boundary calls.
//!
//! There is no cancellation primitive: a caller starts an [`Attempt`] before
//! awaiting a backend call and, once the result arrives, only applies it if no
//! newer attempt has started in the meantime.

use std::sync::atomic::{AtomicU64, Ordering};

/// Ticket handed out by [`AttemptTracker::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Attempt(u64);

impl Attempt {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct AttemptTracker {
    latest: AtomicU64,
}

impl AttemptTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new attempt, superseding every attempt started before it.
    pub fn begin(&self) -> Attempt {
        Attempt(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// True while no newer attempt has been started.
    pub fn is_current(&self, attempt: Attempt) -> bool {
        self.latest.load(Ordering::Acquire) == attempt.0
    }
}
