//! Scenario: the full two-member flow.
//!
//! Member A activates a compute order with member B as provider. A's copy
//! travels OPEN → PENDING; B builds its own copy and drives it OPEN →
//! SPAWNING → FULFILLED; B then pushes INSTANCE_FULFILLED and A's copy
//! transitions PENDING → FULFILLED with the provider-authoritative fields
//! copied over. Deleting from A tears down both sides with exactly one
//! backend deletion, at B.

use fcb_schemas::{InstanceState, OrderState, ResourceType};
use fcb_testkit::{
    compute_request, instance_id_of, wait_for_removal, wait_for_state, InProcessNetwork,
    TestMember,
};
use std::time::Duration;

#[tokio::test(flavor = "multi_thread")]
async fn remote_order_is_fulfilled_through_provider_events() {
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

    // Requester side parks; provider side provisions.
    wait_for_state(&member_a, &order_id, OrderState::Pending, Duration::from_secs(2))
        .await
        .unwrap();
    wait_for_state(&member_b, &order_id, OrderState::Spawning, Duration::from_secs(2))
        .await
        .unwrap();

    // The backend materializes the instance at B.
    let instance_id = instance_id_of(&member_b, &order_id).await.unwrap();
    member_b.cloud.settle(&instance_id);

    wait_for_state(&member_b, &order_id, OrderState::Fulfilled, Duration::from_secs(2))
        .await
        .unwrap();
    // The provider's event moves A's copy out of PENDING.
    wait_for_state(&member_a, &order_id, OrderState::Fulfilled, Duration::from_secs(2))
        .await
        .unwrap();

    {
        let order = member_a.registry.get(&order_id).unwrap();
        let record = order.lock().await;
        assert_eq!(record.cached_instance_state, InstanceState::Ready);
        let allocation = record.actual_allocation.expect("allocation copied from provider");
        assert_eq!(allocation.vcpu, 2);
        assert_eq!(allocation.ram_mb, 2_048);
        assert!(
            record.instance_id.is_none(),
            "the instance id lives only at the providing member"
        );
    }

    // The requester answers instance reads from its snapshot, not the wire.
    let instance = member_a
        .facade
        .get_resource_instance(&order_id, &user, ResourceType::Compute)
        .await
        .unwrap();
    assert_eq!(instance.state(), InstanceState::Ready);

    // Delete from the requester: the provider is told first, then both
    // copies leave their registries; B deletes the backend instance once.
    member_a
        .facade
        .delete_order(&order_id, &user, ResourceType::Compute)
        .await
        .unwrap();
    wait_for_removal(&member_a, &order_id, Duration::from_secs(2))
        .await
        .unwrap();
    wait_for_removal(&member_b, &order_id, Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(member_b.cloud.delete_call_count(), 1);
    assert!(!member_b.cloud.has_instance(&instance_id));
    assert_eq!(member_a.cloud.delete_call_count(), 0);

    engine_a.shutdown().await;
    engine_b.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn provider_side_failure_reaches_the_requester() {
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
    member_b.cloud.break_instance(&instance_id);

    wait_for_state(
        &member_b,
        &order_id,
        OrderState::FailedAfterSuccessfulRequest,
        Duration::from_secs(2),
    )
    .await
    .unwrap();
    wait_for_state(
        &member_a,
        &order_id,
        OrderState::FailedAfterSuccessfulRequest,
        Duration::from_secs(2),
    )
    .await
    .unwrap();

    let order = member_a.registry.get(&order_id).unwrap();
    let record = order.lock().await;
    assert_eq!(record.cached_instance_state, InstanceState::Failed);
    assert!(
        record.once_fault_message.is_some(),
        "the provider's fault diagnostic is copied to the requester"
    );

    drop(record);
    engine_a.shutdown().await;
    engine_b.shutdown().await;
}
