use crate::order::Order;
use crate::registry::OrderRegistry;
use crate::store::OrderStore;
use fcb_schemas::{
    BrokerError, MemberId, OrderEvent, OrderEventKind, OrderRecord, OrderState,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

// ---------------------------------------------------------------------------
// EventNotifier
// ---------------------------------------------------------------------------

/// Delivers provider-side state change events to the requesting member.
///
/// Called by the transitioner while the order's lock is held, so
/// implementations must not block: hand the event to a background task and
/// return. Delivery is at-least-once; the requester discards stale
/// duplicates, so retrying is always safe.
pub trait EventNotifier: Send + Sync {
    fn push_event(&self, requester: &MemberId, event: OrderEvent);
}

/// Drops every event. For single-member deployments and tests that do not
/// exercise federation.
pub struct NoopEventNotifier;

impl EventNotifier for NoopEventNotifier {
    fn push_event(&self, _requester: &MemberId, _event: OrderEvent) {}
}

// ---------------------------------------------------------------------------
// StateTransitioner
// ---------------------------------------------------------------------------

/// The only component allowed to move an order between queues and touch its
/// `state` field.
///
/// `transition` takes the `&mut OrderRecord` behind the order's mutex, so
/// "must hold the order's lock" is enforced by the borrow checker rather
/// than by convention. Calling it twice with the same target state is a
/// no-op.
pub struct StateTransitioner {
    registry: Arc<OrderRegistry>,
    store: Arc<dyn OrderStore>,
    notifier: Arc<dyn EventNotifier>,
    local_member: MemberId,
}

impl StateTransitioner {
    pub fn new(
        registry: Arc<OrderRegistry>,
        store: Arc<dyn OrderStore>,
        notifier: Arc<dyn EventNotifier>,
        local_member: MemberId,
    ) -> Self {
        Self {
            registry,
            store,
            notifier,
            local_member,
        }
    }

    pub fn registry(&self) -> &Arc<OrderRegistry> {
        &self.registry
    }

    /// Insert a brand-new order into the registry and the OPEN queue.
    ///
    /// Unlike `transition`, activation persists synchronously: an order the
    /// store never saw must not enter the engine.
    pub fn activate(&self, mut record: OrderRecord) -> Result<Arc<Order>, BrokerError> {
        if self.registry.contains(&record.id) {
            return Err(BrokerError::Inconsistent(format!(
                "order {} is already active",
                record.id
            )));
        }
        record.state = OrderState::Open;
        self.store.save(&record)?;

        let order = Order::new(record);
        // Queue membership first, then visibility in the active map, so a
        // registry scan never sees an active order outside every queue.
        self.registry.queue(OrderState::Open).append(order.clone());
        self.registry.insert_active(order.clone());
        debug!(order_id = %order.id(), "order activated");
        Ok(order)
    }

    /// Move the order to `next`: remove from the current state's queue, set
    /// the state, insert into the new queue, notify persistence
    /// (fire-and-forget), and push an event to the requester when this
    /// member is the provider of a remotely-requested order reaching a
    /// post-request outcome.
    pub fn transition(&self, order: &Arc<Order>, record: &mut OrderRecord, next: OrderState) {
        if record.state == next {
            // Already there; a concurrent path won the race.
            return;
        }
        let previous = record.state;
        if !self.registry.queue(previous).remove(&record.id) {
            // Membership invariant violation; keep going so the order does
            // not get stuck outside every queue.
            error!(order_id = %record.id, state = %previous, "order missing from its state queue");
        }
        record.state = next;
        self.registry.queue(next).append(order.clone());
        debug!(order_id = %record.id, from = %previous, to = %next, "state transition");

        if let Err(err) = self.store.update(record) {
            warn!(order_id = %record.id, error = %err, "order store update failed");
        }

        self.maybe_notify_requester(record, next);
    }

    /// Remove a closed order from the registry and the store entirely. The
    /// caller holds the order's lock and has confirmed the backend instance
    /// is gone.
    pub fn deactivate(&self, record: &OrderRecord) {
        if record.state != OrderState::Closed {
            error!(order_id = %record.id, state = %record.state, "deactivate on non-closed order refused");
            return;
        }
        self.registry.queue(OrderState::Closed).remove(&record.id);
        self.registry.remove_active(&record.id);
        if let Err(err) = self.store.remove(&record.id) {
            warn!(order_id = %record.id, error = %err, "order store remove failed");
        }
        debug!(order_id = %record.id, "order deactivated");
    }

    /// Rebuild the registry from the store at startup. Each recovered order
    /// lands in the queue matching its persisted state.
    pub fn recover(&self) -> Result<usize, BrokerError> {
        let records = self.store.recover_active()?;
        let mut count = 0usize;
        for record in records {
            if self.registry.contains(&record.id) {
                continue;
            }
            let state = record.state;
            let order = Order::new(record);
            self.registry.queue(state).append(order.clone());
            self.registry.insert_active(order);
            count += 1;
        }
        Ok(count)
    }

    fn maybe_notify_requester(&self, record: &OrderRecord, next: OrderState) {
        let kind = match next {
            OrderState::Fulfilled => OrderEventKind::InstanceFulfilled,
            OrderState::FailedAfterSuccessfulRequest => OrderEventKind::InstanceFailed,
            _ => return,
        };
        // Only the providing member signals, and only for orders some other
        // member requested.
        if !record.is_provider_local(&self.local_member)
            || record.is_requester_local(&self.local_member)
        {
            return;
        }
        let event = OrderEvent {
            order_id: record.id.clone(),
            kind,
            snapshot: record.provider_snapshot(),
        };
        self.notifier.push_event(&record.requester, event);
    }
}
