//! Out-of-band event fan-out.
//!
//! A tokio broadcast channel: the transport subscribes once and forwards
//! every [`Notification`] to its topic. Publishing never blocks; with no
//! subscriber attached the event is dropped.

use tokio::sync::broadcast;
use tracing::debug;

use arena_types::Notification;

#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, notification: Notification) {
        let topic = notification.topic();
        let recipient = notification.recipient();
        match self.tx.send(notification) {
            Ok(receivers) => debug!(%topic, ?recipient, receivers, "notification published"),
            Err(_) => debug!(%topic, ?recipient, "notification dropped, no subscribers"),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}
