//! Periodic liveness broadcast.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use arena_engine::Notifier;
use arena_types::Notification;

/// Publish a `heartbeat` notification every `interval` until aborted.
pub fn spawn_heartbeat(notifier: Notifier, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let server_ping = Utc::now().timestamp_millis();
            debug!(server_ping, "heartbeat");
            notifier.publish(Notification::Heartbeat { server_ping });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn beats_until_aborted() {
        let notifier = Notifier::new(16);
        let mut rx = notifier.subscribe();
        let handle = spawn_heartbeat(notifier, Duration::from_millis(10));

        for _ in 0..3 {
            let beat = time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert!(matches!(beat, Notification::Heartbeat { server_ping } if server_ping > 0));
        }
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
