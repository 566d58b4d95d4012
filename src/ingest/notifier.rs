//! Data-available signal between the ingestion and presentation tasks.

use std::sync::Arc;
use tokio::sync::Notify;

/// Fire-and-forget wakeup for the render consumer.
///
/// Wraps a shared [`Notify`], which stores at most one pending permit:
/// signals raised while the consumer is busy coalesce into a single wakeup.
/// That is exactly the contract the renderer needs, because it always
/// re-reads the latest `snapshot_series()` rather than consuming events one
/// by one. `signal` never blocks the ingestion task.
#[derive(Clone, Debug, Default)]
pub struct RenderNotifier {
    notify: Arc<Notify>,
}

impl RenderNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts a wakeup; drops silently if one is already pending.
    pub fn signal(&self) {
        self.notify.notify_one();
    }

    /// Waits for the next wakeup, consuming the pending permit if any.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}
