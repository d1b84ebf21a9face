//! Scenario: duplicate and spoofed order events.
//!
//! The synchronization protocol promises at-least-once delivery, so the
//! requester must treat a second delivery of the same event as a no-op
//! once the order has left PENDING, and must reject events whose
//! signalling member is not the order's recorded provider.

use fcb_schemas::{
    BrokerError, InstanceState, MemberId, OrderEvent, OrderEventKind, OrderState, ProviderSnapshot,
};
use fcb_testkit::{compute_request, instance_id_of, wait_for_state, InProcessNetwork, TestMember};
use std::time::Duration;

fn fulfilled_event(order_id: &fcb_schemas::OrderId) -> OrderEvent {
    OrderEvent {
        order_id: order_id.clone(),
        kind: OrderEventKind::InstanceFulfilled,
        snapshot: ProviderSnapshot {
            cached_instance_state: InstanceState::Ready,
            actual_allocation: None,
            fault_message: None,
        },
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_event_after_leaving_pending_is_discarded() {
    let network = InProcessNetwork::new();
    let member_a = TestMember::quick("member-a", &network);
    let member_b = TestMember::quick("member-b", &network);
    let user = member_a.user("alice");

    let engine_a = member_a.start_engine();
    let engine_b = member_b.start_engine();

    let order_id = member_a
        .facade
        .activate_order(
            compute_request(),
            Some(member_b.member_id.clone()),
            None,
            &user,
        )
        .await
        .unwrap();

    wait_for_state(&member_b, &order_id, OrderState::Spawning, Duration::from_secs(2))
        .await
        .unwrap();
    let instance_id = instance_id_of(&member_b, &order_id).await.unwrap();
    member_b.cloud.settle(&instance_id);
    wait_for_state(&member_a, &order_id, OrderState::Fulfilled, Duration::from_secs(2))
        .await
        .unwrap();

    // The provider retransmits: the order already left PENDING, so the
    // second delivery must change nothing and report success.
    member_a
        .remote_facade
        .handle_remote_event(&member_b.member_id, &fulfilled_event(&order_id))
        .await
        .unwrap();

    // Even a contradictory late event is discarded.
    let failed_event = OrderEvent {
        kind: OrderEventKind::InstanceFailed,
        ..fulfilled_event(&order_id)
    };
    member_a
        .remote_facade
        .handle_remote_event(&member_b.member_id, &failed_event)
        .await
        .unwrap();

    let order = member_a.registry.get(&order_id).unwrap();
    assert_eq!(order.lock().await.state, OrderState::Fulfilled);

    engine_a.shutdown().await;
    engine_b.shutdown().await;
}

#[tokio::test]
async fn event_from_wrong_member_is_rejected() {
    let network = InProcessNetwork::new();
    let member_a = TestMember::quick("member-a", &network);
    let member_b = TestMember::quick("member-b", &network);
    let user = member_a.user("alice");

    // Order is pending toward member-b.
    let order_id = member_a
        .facade
        .activate_order(
            compute_request(),
            Some(member_b.member_id.clone()),
            None,
            &user,
        )
        .await
        .unwrap();
    let engine_a = member_a.start_engine();
    wait_for_state(&member_a, &order_id, OrderState::Pending, Duration::from_secs(2))
        .await
        .unwrap();

    // A third member claims the outcome: protocol violation, not applied.
    let err = member_a
        .remote_facade
        .handle_remote_event(&MemberId::from("member-evil"), &fulfilled_event(&order_id))
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::Inconsistent(_)));

    let order = member_a.registry.get(&order_id).unwrap();
    assert_eq!(
        order.lock().await.state,
        OrderState::Pending,
        "a rejected event must never be applied"
    );

    engine_a.shutdown().await;
}

#[tokio::test]
async fn event_for_unknown_order_reports_not_found() {
    let network = InProcessNetwork::new();
    let member_a = TestMember::quick("member-a", &network);

    let err = member_a
        .remote_facade
        .handle_remote_event(
            &MemberId::from("member-b"),
            &fulfilled_event(&fcb_schemas::OrderId::from("order-unknown")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::NotFound(_)));
}
