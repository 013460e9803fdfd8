//! Outbound status notifications.

use gamecap_session_model::StatusUpdate;
use tokio::sync::broadcast;

/// Receiver of status pushes. `push` is called with orchestrator state held,
/// so it must not block or call back into the orchestrator.
pub trait StatusSink: Send + Sync {
    fn push(&self, update: StatusUpdate);
}

/// Fans status updates out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastStatusSink {
    tx: broadcast::Sender<StatusUpdate>,
}

impl BroadcastStatusSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastStatusSink {
    fn default() -> Self {
        Self::new(64)
    }
}

impl StatusSink for BroadcastStatusSink {
    fn push(&self, update: StatusUpdate) {
        tracing::trace!(?update, "Status update");
        // No subscribers is normal when running headless.
        let _ = self.tx.send(update);
    }
}
