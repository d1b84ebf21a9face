use crate::order::Order;
use fcb_schemas::{OrderId, OrderState};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// StateQueue
// ---------------------------------------------------------------------------

/// A thread-safe queue with round-robin traversal, one per lifecycle state.
///
/// `next()` returns the element after the last one returned and `None` once
/// a full pass is exhausted; the owning processor then calls
/// `reset_cursor()` and sleeps. `remove` may run concurrently with a
/// traversal (user-triggered delete vs. processor pass); the cursor is
/// adjusted so no element is skipped or returned twice within a pass.
///
/// Structural mutation is guarded by the queue's own lock; callers do not
/// need to hold any order lock.
pub struct StateQueue {
    inner: Mutex<QueueInner>,
}

struct QueueInner {
    items: VecDeque<Arc<Order>>,
    cursor: usize,
}

impl StateQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                cursor: 0,
            }),
        }
    }

    pub fn append(&self, order: Arc<Order>) {
        let mut inner = self.inner.lock().unwrap();
        inner.items.push_back(order);
    }

    /// Remove the order with the given id. Returns `false` when absent.
    pub fn remove(&self, id: &OrderId) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let Some(pos) = inner.items.iter().position(|o| o.id() == id) else {
            return false;
        };
        inner.items.remove(pos);
        if pos < inner.cursor {
            inner.cursor -= 1;
        }
        true
    }

    /// Next element of the current pass, or `None` when the pass is done.
    pub fn next(&self) -> Option<Arc<Order>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.cursor >= inner.items.len() {
            return None;
        }
        let item = inner.items[inner.cursor].clone();
        inner.cursor += 1;
        Some(item)
    }

    /// Restart traversal from the head.
    pub fn reset_cursor(&self) {
        self.inner.lock().unwrap().cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &OrderId) -> bool {
        self.inner.lock().unwrap().items.iter().any(|o| o.id() == id)
    }

    /// Ids currently in the queue, in queue order. For invariant scans.
    pub fn ids(&self) -> Vec<OrderId> {
        self.inner
            .lock()
            .unwrap()
            .items
            .iter()
            .map(|o| o.id().clone())
            .collect()
    }
}

impl Default for StateQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// OrderRegistry
// ---------------------------------------------------------------------------

/// Process-wide table of active orders plus one queue per lifecycle state.
///
/// The registry performs no business logic; orders are inserted and moved by
/// the state transitioner only.
pub struct OrderRegistry {
    active: Mutex<HashMap<OrderId, Arc<Order>>>,
    queues: HashMap<OrderState, StateQueue>,
}

impl OrderRegistry {
    pub fn new() -> Self {
        let mut queues = HashMap::new();
        for state in OrderState::ALL {
            queues.insert(state, StateQueue::new());
        }
        Self {
            active: Mutex::new(HashMap::new()),
            queues,
        }
    }

    pub fn get(&self, id: &OrderId) -> Option<Arc<Order>> {
        self.active.lock().unwrap().get(id).cloned()
    }

    pub fn contains(&self, id: &OrderId) -> bool {
        self.active.lock().unwrap().contains_key(id)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    pub fn queue(&self, state: OrderState) -> &StateQueue {
        // Every state has a queue by construction.
        &self.queues[&state]
    }

    /// Queue length per state, for the status surface.
    pub fn state_counts(&self) -> BTreeMap<String, usize> {
        OrderState::ALL
            .iter()
            .map(|s| (s.to_string(), self.queue(*s).len()))
            .collect()
    }

    /// All active orders, unordered. For invariant scans and recovery
    /// bookkeeping; not used on the hot path.
    pub fn active_orders(&self) -> Vec<Arc<Order>> {
        self.active.lock().unwrap().values().cloned().collect()
    }

    pub(crate) fn insert_active(&self, order: Arc<Order>) {
        self.active.lock().unwrap().insert(order.id().clone(), order);
    }

    pub(crate) fn remove_active(&self, id: &OrderId) -> Option<Arc<Order>> {
        self.active.lock().unwrap().remove(id)
    }
}

impl Default for OrderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcb_schemas::{MemberId, OrderRecord, ResourceRequest, SystemUser, VolumeRequest};

    fn order(n: u64) -> Arc<Order> {
        let mut record = OrderRecord::new(
            ResourceRequest::Volume(VolumeRequest {
                name: None,
                size_gb: n,
            }),
            MemberId::from("m"),
            MemberId::from("m"),
            "default",
            SystemUser::new("u1", "u1", MemberId::from("m")),
        );
        record.id = OrderId::from(format!("order-{n}").as_str());
        Order::new(record)
    }

    #[test]
    fn next_walks_one_full_pass_then_returns_none() {
        let q = StateQueue::new();
        for n in 0..3 {
            q.append(order(n));
        }

        let mut seen = Vec::new();
        while let Some(o) = q.next() {
            seen.push(o.id().clone());
        }
        assert_eq!(seen.len(), 3);
        assert!(q.next().is_none(), "exhausted pass keeps returning None");

        q.reset_cursor();
        assert_eq!(q.next().unwrap().id(), &seen[0], "reset restarts at head");
    }

    #[test]
    fn remove_behind_cursor_does_not_skip_elements() {
        let q = StateQueue::new();
        for n in 0..4 {
            q.append(order(n));
        }

        let first = q.next().unwrap();
        let second = q.next().unwrap();
        // Remove an already-visited element mid-pass.
        assert!(q.remove(first.id()));

        let third = q.next().unwrap();
        let fourth = q.next().unwrap();
        assert!(q.next().is_none());

        let pass: Vec<_> = vec![second.id().clone(), third.id().clone(), fourth.id().clone()];
        assert_eq!(pass.len(), 3);
        assert!(!pass.contains(first.id()), "removed element never reappears");
    }

    #[test]
    fn remove_ahead_of_cursor_shrinks_the_pass() {
        let q = StateQueue::new();
        let orders: Vec<_> = (0..3).map(order).collect();
        for o in &orders {
            q.append(o.clone());
        }

        let _ = q.next().unwrap();
        assert!(q.remove(orders[2].id()));
        let second = q.next().unwrap();
        assert_eq!(second.id(), orders[1].id());
        assert!(q.next().is_none());
    }

    #[test]
    fn remove_absent_id_is_false() {
        let q = StateQueue::new();
        q.append(order(1));
        assert!(!q.remove(&OrderId::from("order-unknown")));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn registry_has_a_queue_for_every_state() {
        let registry = OrderRegistry::new();
        for state in OrderState::ALL {
            assert_eq!(registry.queue(state).len(), 0);
        }
        assert_eq!(registry.state_counts().len(), OrderState::ALL.len());
    }

    #[test]
    fn concurrent_next_and_remove_never_panic() {
        let q = Arc::new(StateQueue::new());
        let orders: Vec<_> = (0..64).map(order).collect();
        for o in &orders {
            q.append(o.clone());
        }

        let walker = {
            let q = Arc::clone(&q);
            std::thread::spawn(move || {
                let mut seen = 0usize;
                loop {
                    match q.next() {
                        Some(_) => seen += 1,
                        None => break,
                    }
                }
                seen
            })
        };
        let remover = {
            let q = Arc::clone(&q);
            let ids: Vec<_> = orders.iter().map(|o| o.id().clone()).collect();
            std::thread::spawn(move || {
                for id in ids.iter().step_by(2) {
                    q.remove(id);
                }
            })
        };

        let seen = walker.join().unwrap();
        remover.join().unwrap();
        assert!(seen <= 64);
        assert!(q.len() >= 32, "only half the ids were eligible for removal");
    }
}
