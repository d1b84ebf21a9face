//! fcb-testkit
//!
//! In-process federation harness for scenario tests: fully wired broker
//! members backed by the emulated cloud, talking over an in-process
//! transport. No network, no disk, fast poll intervals.

pub mod member;
pub mod network;

pub use member::{compute_request, network_request, volume_request, TestMember};
pub use network::{InProcessNetwork, InProcessPeerClient};

use fcb_core::Order;
use fcb_schemas::{OrderId, OrderState};
use std::sync::Arc;
use std::time::Duration;

/// Poll until the order reaches `expected`, or fail with the state it was
/// stuck in.
pub async fn wait_for_state(
    member: &TestMember,
    order_id: &OrderId,
    expected: OrderState,
    timeout: Duration,
) -> Result<(), String> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut last_seen = None;
    while tokio::time::Instant::now() < deadline {
        match member.registry.get(order_id) {
            Some(order) => {
                let state = order.lock().await.state;
                if state == expected {
                    return Ok(());
                }
                last_seen = Some(state);
            }
            None => {
                last_seen = None;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    Err(format!(
        "order {order_id} did not reach {expected} within {timeout:?} (last seen: {last_seen:?})"
    ))
}

/// Poll until the order disappears from the registry (closed-path removal).
pub async fn wait_for_removal(
    member: &TestMember,
    order_id: &OrderId,
    timeout: Duration,
) -> Result<(), String> {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if member.registry.get(order_id).is_none() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    Err(format!("order {order_id} was not removed within {timeout:?}"))
}

/// The backend instance id assigned to an order, once known.
pub async fn instance_id_of(member: &TestMember, order_id: &OrderId) -> Option<String> {
    let order = member.registry.get(order_id)?;
    let record = order.lock().await;
    record.instance_id.clone()
}

/// Exhaustive registry scan: every active order must sit in exactly one
/// state queue, and that queue must match its `state` field.
pub async fn assert_queue_membership(member: &TestMember) {
    let orders: Vec<Arc<Order>> = member.registry.active_orders();
    for order in orders {
        let state = order.lock().await.state;
        let mut homes = Vec::new();
        for candidate in OrderState::ALL {
            if member.registry.queue(candidate).contains(order.id()) {
                homes.push(candidate);
            }
        }
        assert_eq!(
            homes,
            vec![state],
            "order {} (state {state}) must be in exactly the queue matching its state",
            order.id()
        );
    }
}
