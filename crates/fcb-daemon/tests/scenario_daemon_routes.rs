//! In-process scenario tests for fcb-daemon HTTP endpoints.
//!
//! These tests spin up the Axum router **without** binding a TCP socket.
//! Each test calls `routes::build_router` and drives it via
//! `tower::ServiceExt::oneshot`; no network I/O required.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use fcb_config::BrokerConfig;
use fcb_daemon::{routes, state, wiring};
use fcb_federation::PeerEnvelope;
use fcb_schemas::{
    MemberId, OrderRecord, PeerRequest, ResourceRequest, SystemUser, VolumeRequest,
};
use http_body_util::BodyExt;
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a fresh in-process router backed by a wired (engine-off) member.
fn make_member() -> (axum::Router, wiring::Member) {
    let config = BrokerConfig {
        local_member_id: "member-b".to_string(),
        ..BrokerConfig::default()
    };
    let member = wiring::build_member(&config).expect("wiring failed");
    let st = state::AppState::new(
        member.member_id.clone(),
        member.facade.clone(),
        member.remote_facade.clone(),
        member.registry.clone(),
        "test-config-hash".to_string(),
    );
    (routes::build_router(st), member)
}

/// Drive the router with a single request and return (status, body_bytes).
async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn peer_post(envelope: &PeerEnvelope) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/peer")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(envelope).unwrap(),
        ))
        .unwrap()
}

fn volume_order_from_a() -> OrderRecord {
    OrderRecord::new(
        ResourceRequest::Volume(VolumeRequest {
            name: None,
            size_gb: 10,
        }),
        MemberId::from("member-a"),
        MemberId::from("member-b"),
        "default",
        SystemUser::new("alice", "alice", MemberId::from("member-a")),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let (router, _member) = make_member();
    let req = Request::builder()
        .method("GET")
        .uri("/v1/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "fcb-daemon");
    assert_eq!(json["member_id"], "member-b");
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_reports_state_counts() {
    let (router, member) = make_member();

    // One order parked in OPEN (engine off).
    let user = SystemUser::new("alice", "alice", member.member_id.clone());
    member
        .facade
        .controller()
        .activate_order(
            ResourceRequest::Volume(VolumeRequest {
                name: None,
                size_gb: 1,
            }),
            None,
            None,
            &user,
        )
        .unwrap();

    let req = Request::builder()
        .method("GET")
        .uri("/v1/status")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["member_id"], "member-b");
    assert_eq!(json["active_orders"], 1);
    assert_eq!(json["state_counts"]["OPEN"], 1);
    assert_eq!(json["config_hash"], "test-config-hash");
}

// ---------------------------------------------------------------------------
// POST /v1/peer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn peer_activation_round_trips() {
    let (router, member) = make_member();
    let order = volume_order_from_a();
    let order_id = order.id.clone();

    let envelope = PeerEnvelope {
        sender: MemberId::from("member-a"),
        request: PeerRequest::ActivateOrder { order },
    };
    let (status, body) = call(router, peer_post(&envelope)).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"]["result"], "ACCEPTED");
    assert!(member.registry.contains(&order_id));
}

#[tokio::test]
async fn peer_consistency_violation_maps_to_400() {
    let (router, member) = make_member();
    let order = volume_order_from_a();
    let order_id = order.id.clone();

    // Sender claims to be member-c, but the order was requested by member-a.
    let envelope = PeerEnvelope {
        sender: MemberId::from("member-c"),
        request: PeerRequest::ActivateOrder { order },
    };
    let (status, body) = call(router, peer_post(&envelope)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let json = parse_json(body);
    assert_eq!(json["error"]["kind"], "INCONSISTENT");
    assert!(!member.registry.contains(&order_id));
}

#[tokio::test]
async fn peer_unknown_order_maps_to_404() {
    let (router, _member) = make_member();

    let envelope = PeerEnvelope {
        sender: MemberId::from("member-a"),
        request: PeerRequest::DeleteOrder {
            order_id: fcb_schemas::OrderId::from("order-unknown"),
            resource_type: fcb_schemas::ResourceType::Volume,
            user: SystemUser::new("alice", "alice", MemberId::from("member-a")),
        },
    };
    let (status, body) = call(router, peer_post(&envelope)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse_json(body)["error"]["kind"], "NOT_FOUND");
}
