//! Bounded pool for asynchronous settlement calls.
//!
//! Match logs and atomic swaps run as spawned tasks so the caller that
//! triggered them is never blocked on the ledger. A semaphore caps how many
//! of them talk to the ledger at once; excess tasks wait for a permit.
//! Tasks are only spawned after the store lock has been released.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct SettlementPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl SettlementPool {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Run `task` once a permit is available.
    pub fn spawn<F>(&self, label: &'static str, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                warn!(task = label, "settlement pool closed, task dropped");
                return;
            };
            debug!(task = label, "settlement task started");
            task.await;
        })
    }

    /// Settlement tasks currently holding a permit.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
