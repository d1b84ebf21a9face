use fcb_schemas::{OrderId, OrderRecord};
use tokio::sync::{Mutex, MutexGuard};

/// The engine-side handle to one order: the id, readable without locking,
/// and the record behind the order's own mutex.
///
/// This is the per-order lock the whole engine is built on. A processor's
/// status check and a user's delete can race on the same order; whichever
/// acquires the lock first completes its transition, the loser observes the
/// changed state and no-ops. Holding the guard across a connector call is
/// intentional: a slow backend delays only this order.
pub struct Order {
    id: OrderId,
    record: Mutex<OrderRecord>,
}

impl Order {
    pub fn new(record: OrderRecord) -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            id: record.id.clone(),
            record: Mutex::new(record),
        })
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    /// Acquire the order's lock.
    pub async fn lock(&self) -> MutexGuard<'_, OrderRecord> {
        self.record.lock().await
    }

    /// Non-blocking lock attempt; used by invariant scans that must not
    /// deadlock against in-flight processing.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, OrderRecord>> {
        self.record.try_lock().ok()
    }
}

impl std::fmt::Debug for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Order").field("id", &self.id).finish()
    }
}
