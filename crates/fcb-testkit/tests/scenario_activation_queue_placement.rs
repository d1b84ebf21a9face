//! Scenario: activation queue placement.
//!
//! # Invariants under test
//! - Activating with the local member as provider places the order in OPEN,
//!   and the engine then advances it through SPAWNING.
//! - Activating with a different provider also places the order in OPEN,
//!   but after dispatch it parks in PENDING and the spawning processor
//!   never picks it up: remote orders advance only via incoming events.

use fcb_schemas::{OrderState, ResourceType};
use fcb_testkit::{
    compute_request, volume_request, wait_for_state, InProcessNetwork, TestMember,
};
use std::time::Duration;

#[tokio::test]
async fn local_activation_lands_in_open_then_spawning() {
    let network = InProcessNetwork::new();
    let member = TestMember::quick("member-a", &network);
    let user = member.user("alice");

    let order_id = member
        .facade
        .activate_order(volume_request(10), None, None, &user)
        .await
        .unwrap();

    // Engine not running yet: the order must sit in OPEN.
    assert!(member.registry.queue(OrderState::Open).contains(&order_id));
    {
        let order = member.registry.get(&order_id).unwrap();
        let record = order.lock().await;
        assert_eq!(record.state, OrderState::Open);
        assert_eq!(record.requester, member.member_id);
        assert_eq!(record.provider, member.member_id);
        assert_eq!(record.cloud_name, "default");
    }

    let engine = member.start_engine();
    wait_for_state(&member, &order_id, OrderState::Spawning, Duration::from_secs(2))
        .await
        .unwrap();
    engine.shutdown().await;
}

#[tokio::test]
async fn remote_activation_parks_in_pending_and_spawning_never_touches_it() {
    let network = InProcessNetwork::new();
    let requester = TestMember::quick("member-a", &network);
    // The provider exists and accepts the dispatch, but its engine is off,
    // so no event will ever come back during this test.
    let provider = TestMember::quick("member-b", &network);
    let user = requester.user("alice");

    let order_id = requester
        .facade
        .activate_order(
            compute_request(),
            Some(provider.member_id.clone()),
            None,
            &user,
        )
        .await
        .unwrap();
    assert!(requester.registry.queue(OrderState::Open).contains(&order_id));

    let engine = requester.start_engine();
    wait_for_state(&requester, &order_id, OrderState::Pending, Duration::from_secs(2))
        .await
        .unwrap();

    // The provider received its own copy, still OPEN (its engine is off).
    wait_for_state(&provider, &order_id, OrderState::Open, Duration::from_secs(2))
        .await
        .unwrap();

    // Give the requester's processors a few dozen passes: the order must
    // stay PENDING, untouched by the spawning loop.
    tokio::time::sleep(Duration::from_millis(150)).await;
    {
        let order = requester.registry.get(&order_id).unwrap();
        assert_eq!(order.lock().await.state, OrderState::Pending);
    }
    assert!(requester
        .registry
        .queue(OrderState::Spawning)
        .is_empty());
    assert_eq!(requester.cloud.instance_count(), 0, "no local provisioning");

    engine.shutdown().await;
}

#[tokio::test]
async fn activation_to_unknown_provider_fails_the_order() {
    let network = InProcessNetwork::new();
    let requester = TestMember::quick("member-a", &network);
    let user = requester.user("alice");

    let order_id = requester
        .facade
        .activate_order(
            volume_request(5),
            Some(fcb_schemas::MemberId::from("member-ghost")),
            None,
            &user,
        )
        .await
        .unwrap();

    let engine = requester.start_engine();
    wait_for_state(&requester, &order_id, OrderState::Failed, Duration::from_secs(2))
        .await
        .unwrap();
    {
        let order = requester.registry.get(&order_id).unwrap();
        let record = order.lock().await;
        assert!(
            record.once_fault_message.is_some(),
            "dispatch failure must record a fault message"
        );
    }
    engine.shutdown().await;
}

#[tokio::test]
async fn type_mismatch_on_lookup_is_rejected() {
    let network = InProcessNetwork::new();
    let member = TestMember::quick("member-a", &network);
    let user = member.user("alice");

    let order_id = member
        .facade
        .activate_order(volume_request(10), None, None, &user)
        .await
        .unwrap();

    let err = member
        .facade
        .get_resource_instance(&order_id, &user, ResourceType::Compute)
        .await
        .unwrap_err();
    assert!(matches!(err, fcb_schemas::BrokerError::Inconsistent(_)));

    // The owner check fires before anything else for a foreign principal.
    let stranger = member.user("mallory");
    let err = member
        .facade
        .get_resource_instance(&order_id, &stranger, ResourceType::Volume)
        .await
        .unwrap_err();
    assert!(matches!(err, fcb_schemas::BrokerError::Unauthorized(_)));
}
