use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{CacheKey, Result};
use crate::ports::Connector;

type PendingConnector = Shared<BoxFuture<'static, Result<Arc<dyn Connector>>>>;

enum Slot {
    /// Construction in flight; every caller for the key awaits the same future.
    Pending { attempt: u64, future: PendingConnector },
    Ready(Arc<dyn Connector>),
}

/// Lazily populated store of connectors, at most one per key.
///
/// Entries live until [`AgentCache::evict_all`]. A failed construction
/// clears its slot so the next caller builds afresh.
#[derive(Default)]
pub struct AgentCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    attempts: AtomicU64,
}

impl AgentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_create<F, Fut>(&self, key: &CacheKey, factory: F) -> Result<Arc<dyn Connector>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn Connector>>> + Send + 'static,
    {
        let (attempt, pending) = {
            let mut slots = self.slots.lock().await;
            match slots.get(key) {
                Some(Slot::Ready(connector)) => return Ok(connector.clone()),
                Some(Slot::Pending { attempt, future }) => {
                    debug!(key = %key, "joining in-flight connector construction");
                    (*attempt, future.clone())
                }
                None => {
                    let attempt = self.attempts.fetch_add(1, Ordering::Relaxed);
                    let future = factory().boxed().shared();
                    slots.insert(
                        key.clone(),
                        Slot::Pending {
                            attempt,
                            future: future.clone(),
                        },
                    );
                    (attempt, future)
                }
            }
        };

        // Dropping this caller does not cancel the construction for other waiters.
        let result = pending.await;

        let mut slots = self.slots.lock().await;
        let owns_slot = matches!(slots.get(key), Some(Slot::Pending { attempt: current, .. }) if *current == attempt);
        if owns_slot {
            match &result {
                Ok(connector) => {
                    info!(key = %key, route = %connector.route(), "connector ready");
                    slots.insert(key.clone(), Slot::Ready(connector.clone()));
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "connector construction failed");
                    slots.remove(key);
                }
            }
        }
        result
    }

    /// Ready connector for `key`, without constructing one.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<dyn Connector>> {
        match self.slots.lock().await.get(key) {
            Some(Slot::Ready(connector)) => Some(connector.clone()),
            _ => None,
        }
    }

    /// Number of ready connectors.
    pub async fn len(&self) -> usize {
        self.slots
            .lock()
            .await
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Closes every ready connector and forgets all slots.
    ///
    /// A construction still in flight completes for its waiters but is not
    /// cached and never closed here: those waiters use it for the request
    /// they are serving, and it is released when the last `Arc` drops.
    pub async fn evict_all(&self) {
        let drained: Vec<(CacheKey, Slot)> = self.slots.lock().await.drain().collect();
        info!(count = drained.len(), "evicting cached connectors");
        for (key, slot) in drained {
            if let Slot::Ready(connector) = slot {
                debug!(key = %key, "closing connector");
                connector.close().await;
            }
        }
    }
}
