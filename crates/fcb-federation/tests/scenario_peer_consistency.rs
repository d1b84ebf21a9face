//! Scenario: consistency enforcement on the member-to-member surface.
//!
//! The serving side must reject, never apply:
//! - requests whose sender is not the order's recorded requester,
//! - orders whose provider is not this member,
//! - operations under a principal that does not own the order.

use fcb_audit::NullAuditSink;
use fcb_cloud::{CloudCatalog, EmulatedCloud};
use fcb_core::{
    AllowAllPlugin, ConnectorFactory, InMemoryOrderStore, NoopEventNotifier, OrderController,
    OrderRegistry, StateTransitioner, UnreachablePeerClient,
};
use fcb_federation::{serve_request, RemoteFacade};
use fcb_schemas::{
    BrokerError, MemberId, OrderRecord, PeerRequest, PeerResponse, ResourceRequest, ResourceType,
    SystemUser, VolumeRequest,
};
use std::sync::Arc;
use std::time::Duration;

/// A providing member ("member-b") with an emulated cloud, wired by hand.
fn provider_member() -> (Arc<RemoteFacade>, Arc<OrderRegistry>) {
    let local = MemberId::from("member-b");
    let catalog = Arc::new(
        CloudCatalog::new("default").register(Arc::new(EmulatedCloud::new("default"))),
    );
    let factory = Arc::new(ConnectorFactory::new(
        local.clone(),
        catalog,
        Arc::new(NullAuditSink),
        Arc::new(UnreachablePeerClient),
        Duration::from_millis(200),
    ));
    let registry = Arc::new(OrderRegistry::new());
    let transitioner = Arc::new(StateTransitioner::new(
        registry.clone(),
        Arc::new(InMemoryOrderStore::new()),
        Arc::new(NoopEventNotifier),
        local.clone(),
    ));
    let controller = Arc::new(OrderController::new(
        registry.clone(),
        transitioner.clone(),
        factory,
        local,
        "default",
    ));
    let facade = Arc::new(RemoteFacade::new(
        controller,
        transitioner,
        Arc::new(AllowAllPlugin),
    ));
    (facade, registry)
}

fn alice() -> SystemUser {
    SystemUser::new("alice", "alice", MemberId::from("member-a"))
}

fn volume_order(requester: &str, provider: &str) -> OrderRecord {
    OrderRecord::new(
        ResourceRequest::Volume(VolumeRequest {
            name: None,
            size_gb: 10,
        }),
        MemberId::from(requester),
        MemberId::from(provider),
        "default",
        alice(),
    )
}

#[tokio::test]
async fn activation_from_the_wrong_sender_is_rejected() {
    let (facade, registry) = provider_member();
    let order = volume_order("member-a", "member-b");
    let order_id = order.id.clone();

    // member-c relays member-a's order: consistency violation.
    let err = serve_request(
        &facade,
        &MemberId::from("member-c"),
        PeerRequest::ActivateOrder { order },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BrokerError::Inconsistent(_)));
    assert!(!registry.contains(&order_id), "rejected orders are not activated");
}

#[tokio::test]
async fn activation_for_another_provider_is_rejected() {
    let (facade, registry) = provider_member();
    // Correct sender, but the order names member-x as provider.
    let order = volume_order("member-a", "member-x");
    let order_id = order.id.clone();

    let err = serve_request(
        &facade,
        &MemberId::from("member-a"),
        PeerRequest::ActivateOrder { order },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BrokerError::NotFound(_)));
    assert!(!registry.contains(&order_id));
}

#[tokio::test]
async fn well_formed_activation_is_accepted_once() {
    let (facade, registry) = provider_member();
    let order = volume_order("member-a", "member-b");
    let order_id = order.id.clone();

    let response = serve_request(
        &facade,
        &MemberId::from("member-a"),
        PeerRequest::ActivateOrder {
            order: order.clone(),
        },
    )
    .await
    .unwrap();
    assert_eq!(response, PeerResponse::Accepted);
    assert!(registry.contains(&order_id));

    // Replayed activation of the same order id cannot take.
    let err = serve_request(
        &facade,
        &MemberId::from("member-a"),
        PeerRequest::ActivateOrder { order },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BrokerError::Inconsistent(_)));
}

#[tokio::test]
async fn reads_enforce_sender_owner_and_type() {
    let (facade, _registry) = provider_member();
    let order = volume_order("member-a", "member-b");
    let order_id = order.id.clone();
    serve_request(
        &facade,
        &MemberId::from("member-a"),
        PeerRequest::ActivateOrder { order },
    )
    .await
    .unwrap();

    // Wrong sender.
    let err = serve_request(
        &facade,
        &MemberId::from("member-c"),
        PeerRequest::GetInstance {
            order_id: order_id.clone(),
            resource_type: ResourceType::Volume,
            user: alice(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BrokerError::Inconsistent(_)));

    // Wrong principal.
    let err = serve_request(
        &facade,
        &MemberId::from("member-a"),
        PeerRequest::GetInstance {
            order_id: order_id.clone(),
            resource_type: ResourceType::Volume,
            user: SystemUser::new("mallory", "mallory", MemberId::from("member-a")),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BrokerError::Unauthorized(_)));

    // Wrong resource type for the endpoint.
    let err = serve_request(
        &facade,
        &MemberId::from("member-a"),
        PeerRequest::GetInstance {
            order_id: order_id.clone(),
            resource_type: ResourceType::Compute,
            user: alice(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BrokerError::Inconsistent(_)));

    // Everything aligned: the placeholder instance of an OPEN order.
    let response = serve_request(
        &facade,
        &MemberId::from("member-a"),
        PeerRequest::GetInstance {
            order_id,
            resource_type: ResourceType::Volume,
            user: alice(),
        },
    )
    .await
    .unwrap();
    match response {
        PeerResponse::Instance { instance } => {
            assert_eq!(instance.state(), fcb_schemas::InstanceState::Dispatched);
        }
        other => panic!("expected an instance, got {other:?}"),
    }
}

#[tokio::test]
async fn cloud_scoped_queries_answer_for_the_local_catalog() {
    let (facade, _registry) = provider_member();

    let response = serve_request(
        &facade,
        &MemberId::from("member-a"),
        PeerRequest::GetCloudNames { user: alice() },
    )
    .await
    .unwrap();
    assert_eq!(
        response,
        PeerResponse::CloudNames {
            clouds: vec!["default".to_string()]
        }
    );

    let response = serve_request(
        &facade,
        &MemberId::from("member-a"),
        PeerRequest::GetUserQuota {
            cloud_name: "default".to_string(),
            user: alice(),
        },
    )
    .await
    .unwrap();
    match response {
        PeerResponse::Quota { quota } => assert!(quota.total.vcpu > 0),
        other => panic!("expected a quota, got {other:?}"),
    }
}
