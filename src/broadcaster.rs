use tokio::sync::broadcast;
use tracing::debug;

use crate::db::models::Reading;

/// Fans newly persisted readings out to every live subscriber.
///
/// Cheap to clone; clones publish into the same channel. Delivery is
/// best-effort: a subscriber only sees readings published after it
/// subscribed, and nothing is replayed.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<Reading>,
}

impl Broadcaster {
    /// `capacity` is how many readings a slow subscriber may fall behind
    /// before it starts skipping.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Hand `reading` to all current subscribers. Never waits on them.
    pub fn publish(&self, reading: Reading) {
        let id = reading.id;
        match self.tx.send(reading) {
            Ok(receivers) => debug!(id, receivers, "Published reading"),
            Err(_) => debug!(id, "No live subscribers; reading not broadcast"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Reading> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
