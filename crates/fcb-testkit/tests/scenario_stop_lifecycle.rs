//! Scenario: the compute stop lifecycle.
//!
//! FULFILLED → STOPPING → STOPPED, driven by the stopping processor
//! polling until the backend reports the instance stopped. Stop is
//! compute-only, fulfilled-only, and local-provider-only.

use fcb_schemas::{BrokerError, InstanceState, OrderState};
use fcb_testkit::{
    compute_request, instance_id_of, volume_request, wait_for_state, InProcessNetwork, TestMember,
};
use std::time::Duration;

#[tokio::test]
async fn fulfilled_compute_stops_when_the_backend_reports_stopped() {
    let network = InProcessNetwork::new();
    let member = TestMember::quick("member-a", &network);
    let user = member.user("alice");
    let engine = member.start_engine();

    let order_id = member
        .facade
        .activate_order(compute_request(), None, None, &user)
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

    member.facade.stop_order(&order_id, &user).await.unwrap();
    {
        let order = member.registry.get(&order_id).unwrap();
        assert_eq!(order.lock().await.state, OrderState::Stopping);
    }

    // The backend takes a moment to wind the instance down.
    tokio::time::sleep(Duration::from_millis(30)).await;
    member.cloud.stop_instance(&instance_id);

    wait_for_state(&member, &order_id, OrderState::Stopped, Duration::from_secs(2))
        .await
        .unwrap();
    let order = member.registry.get(&order_id).unwrap();
    assert_eq!(
        order.lock().await.cached_instance_state,
        InstanceState::Stopped
    );

    engine.shutdown().await;
}

#[tokio::test]
async fn stop_is_rejected_outside_fulfilled_or_for_non_compute() {
    let network = InProcessNetwork::new();
    let member = TestMember::quick("member-a", &network);
    let user = member.user("alice");

    // Not fulfilled yet (engine off, order stays OPEN).
    let compute_id = member
        .facade
        .activate_order(compute_request(), None, None, &user)
        .await
        .unwrap();
    let err = member.facade.stop_order(&compute_id, &user).await.unwrap_err();
    assert!(matches!(err, BrokerError::InvalidParameter(_)));

    // Not a compute order: the type check fires on lookup.
    let volume_id = member
        .facade
        .activate_order(volume_request(10), None, None, &user)
        .await
        .unwrap();
    let err = member.facade.stop_order(&volume_id, &user).await.unwrap_err();
    assert!(matches!(err, BrokerError::Inconsistent(_)));
}

#[tokio::test]
async fn stop_is_rejected_for_remotely_provided_orders() {
    let network = InProcessNetwork::new();
    let member_a = TestMember::quick("member-a", &network);
    let member_b = TestMember::quick("member-b", &network);
    let user = member_a.user("alice");

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

    let err = member_a.facade.stop_order(&order_id, &user).await.unwrap_err();
    assert!(matches!(err, BrokerError::InvalidParameter(_)));
}
