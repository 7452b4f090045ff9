//! Session-scoped token accounting.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::ports::UsageTracker;

/// Monotonic token counter shared by every collaborator in one run.
///
/// Adapters that learn how many tokens a call consumed report it through
/// [`record`](Self::record); the loop controller reads the total through the
/// [`UsageTracker`] port before each fix round.
#[derive(Debug, Default)]
pub struct SessionUsage {
    total: AtomicU64,
}

impl SessionUsage {
    /// Counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already-spent amount (e.g. carried over from a resumed session).
    pub fn with_initial(tokens: u64) -> Self {
        Self {
            total: AtomicU64::new(tokens),
        }
    }

    /// Add `tokens` to the running total; saturates instead of wrapping.
    pub fn record(&self, tokens: u64) {
        if tokens == 0 {
            return;
        }
        let _ = self
            .total
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(tokens))
            });
    }
}

impl UsageTracker for SessionUsage {
    fn total_tokens(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }
}
