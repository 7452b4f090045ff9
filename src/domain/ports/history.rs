//! Run history port.

use async_trait::async_trait;

use crate::domain::models::HistoryEvent;

/// Append-only sink for [`HistoryEvent`]s.
///
/// Recording never fails from the caller's point of view: an implementation
/// logs its own write errors, and a run carries on without its history.
#[async_trait]
pub trait RunHistory: Send + Sync {
    /// Append one event.
    async fn record(&self, event: HistoryEvent);
}
