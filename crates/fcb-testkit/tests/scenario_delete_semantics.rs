//! Scenario: delete semantics along the lifecycle.
//!
//! - Deleting an OPEN order closes it directly; the backend is never
//!   called and the closed processor simply drops it from the registry.
//! - Deleting a FULFILLED order issues exactly one backend
//!   `delete_instance` before the order is removed.
//! - Deleting an already-closed order is rejected.

use fcb_schemas::{BrokerError, OrderState, ResourceType};
use fcb_testkit::{
    instance_id_of, volume_request, wait_for_removal, wait_for_state, InProcessNetwork, TestMember,
};
use std::time::Duration;

#[tokio::test]
async fn deleting_an_open_order_makes_no_backend_call() {
    let network = InProcessNetwork::new();
    let member = TestMember::quick("member-a", &network);
    let user = member.user("alice");

    // Engine off: the order stays OPEN until we delete it.
    let order_id = member
        .facade
        .activate_order(volume_request(10), None, None, &user)
        .await
        .unwrap();

    member
        .facade
        .delete_order(&order_id, &user, ResourceType::Volume)
        .await
        .unwrap();
    {
        let order = member.registry.get(&order_id).unwrap();
        assert_eq!(order.lock().await.state, OrderState::Closed);
    }
    assert_eq!(member.cloud.delete_call_count(), 0);
    assert_eq!(member.cloud.instance_count(), 0);

    // The closed processor removes it without touching the cloud.
    let engine = member.start_engine();
    wait_for_removal(&member, &order_id, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(member.cloud.delete_call_count(), 0);
    assert!(member.store.get(&order_id).is_none(), "store entry removed");
    engine.shutdown().await;
}

#[tokio::test]
async fn deleting_a_fulfilled_order_issues_exactly_one_backend_delete() {
    let network = InProcessNetwork::new();
    let member = TestMember::quick("member-a", &network);
    let user = member.user("alice");
    let engine = member.start_engine();

    let order_id = member
        .facade
        .activate_order(volume_request(10), None, None, &user)
        .await
        .unwrap();
    wait_for_state(&member, &order_id, OrderState::Spawning, Duration::from_secs(2))
        .await
        .unwrap();
    let instance_id = instance_id_of(&member, &order_id).await.unwrap();
    member.cloud.settle(&instance_id);
    wait_for_state(&member, &order_id, OrderState::Fulfilled, Duration::from_secs(2))
        .await
        .unwrap();

    member
        .facade
        .delete_order(&order_id, &user, ResourceType::Volume)
        .await
        .unwrap();
    wait_for_removal(&member, &order_id, Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(member.cloud.delete_call_count(), 1);
    assert!(!member.cloud.has_instance(&instance_id));
    engine.shutdown().await;
}

#[tokio::test]
async fn deleting_a_closed_order_is_rejected() {
    let network = InProcessNetwork::new();
    let member = TestMember::quick("member-a", &network);
    let user = member.user("alice");

    let order_id = member
        .facade
        .activate_order(volume_request(10), None, None, &user)
        .await
        .unwrap();
    member
        .facade
        .delete_order(&order_id, &user, ResourceType::Volume)
        .await
        .unwrap();

    let err = member
        .facade
        .delete_order(&order_id, &user, ResourceType::Volume)
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::InvalidParameter(_)));
}

#[tokio::test]
async fn failed_backend_delete_keeps_the_order_until_it_succeeds() {
    let network = InProcessNetwork::new();
    let member = TestMember::quick("member-a", &network);
    let user = member.user("alice");
    let engine = member.start_engine();

    let order_id = member
        .facade
        .activate_order(volume_request(10), None, None, &user)
        .await
        .unwrap();
    wait_for_state(&member, &order_id, OrderState::Spawning, Duration::from_secs(2))
        .await
        .unwrap();
    let instance_id = instance_id_of(&member, &order_id).await.unwrap();
    member.cloud.settle(&instance_id);
    wait_for_state(&member, &order_id, OrderState::Fulfilled, Duration::from_secs(2))
        .await
        .unwrap();

    // First deletion attempt fails; the order must stay CLOSED in the
    // registry and be retried until the backend confirms.
    member
        .cloud
        .fail_next_delete(BrokerError::Unavailable("backend flake".into()));
    member
        .facade
        .delete_order(&order_id, &user, ResourceType::Volume)
        .await
        .unwrap();

    wait_for_removal(&member, &order_id, Duration::from_secs(2))
        .await
        .unwrap();
    assert!(
        member.cloud.delete_call_count() >= 2,
        "the failed attempt must be retried"
    );
    assert!(!member.cloud.has_instance(&instance_id));
    engine.shutdown().await;
}
