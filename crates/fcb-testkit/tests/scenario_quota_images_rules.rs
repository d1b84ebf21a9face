//! Scenario: the cloud-scoped query paths (quota, images, cloud names,
//! generic pass-through) and security rule CRUD, local and across members.

use fcb_schemas::{OrderState, SecurityRule, SecurityRuleDirection};
use fcb_testkit::{
    instance_id_of, network_request, wait_for_state, InProcessNetwork, TestMember,
};
use std::time::Duration;

fn ssh_rule() -> SecurityRule {
    SecurityRule {
        id: String::new(),
        direction: SecurityRuleDirection::Ingress,
        protocol: "tcp".to_string(),
        port_from: 22,
        port_to: 22,
        cidr: "0.0.0.0/0".to_string(),
    }
}

#[tokio::test]
async fn quota_reflects_remote_usage_too() {
    let network = InProcessNetwork::new();
    let member_a = TestMember::quick("member-a", &network);
    let member_b = TestMember::quick("member-b", &network);
    let user = member_a.user("alice");

    let local = member_a
        .facade
        .get_user_quota(&member_a.member_id, "default", &user)
        .await
        .unwrap();
    assert_eq!(local.used.instances, 0);
    assert_eq!(local.available.instances, local.total.instances);

    // The same question asked about member-b travels the wire.
    let remote = member_a
        .facade
        .get_user_quota(&member_b.member_id, "default", &user)
        .await
        .unwrap();
    assert_eq!(remote.total.instances, local.total.instances);
}

#[tokio::test]
async fn images_and_cloud_names_resolve_locally_and_remotely() {
    let network = InProcessNetwork::new();
    let member_a = TestMember::quick("member-a", &network);
    let member_b = TestMember::quick("member-b", &network);
    let user = member_a.user("alice");

    let catalog = member_a
        .facade
        .get_all_images(&member_a.member_id, "default", &user)
        .await
        .unwrap();
    assert!(catalog.contains_key("image-0001"));

    let image = member_a
        .facade
        .get_image(&member_b.member_id, "default", "image-0002", &user)
        .await
        .unwrap();
    assert_eq!(image.name, "debian-13");

    let clouds = member_a
        .facade
        .get_cloud_names(&member_b.member_id, &user)
        .await
        .unwrap();
    assert_eq!(clouds, vec!["default".to_string()]);

    let echo = member_a
        .facade
        .generic_request(&member_b.member_id, "default", "list-flavors", &user)
        .await
        .unwrap();
    assert_eq!(echo.get("echo").map(String::as_str), Some("list-flavors"));
}

#[tokio::test]
async fn security_rules_attach_to_a_fulfilled_network_order() {
    let network = InProcessNetwork::new();
    let member = TestMember::quick("member-a", &network);
    let user = member.user("alice");
    let engine = member.start_engine();

    let order_id = member
        .facade
        .activate_order(network_request(), None, None, &user)
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

    let rule_id = member
        .facade
        .create_security_rule(&order_id, ssh_rule(), &user)
        .await
        .unwrap();

    let rules = member
        .facade
        .get_security_rules(&order_id, &user)
        .await
        .unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].id, rule_id);
    assert_eq!(rules[0].port_from, 22);

    member
        .facade
        .delete_security_rule(&member.member_id, "default", &rule_id, &user)
        .await
        .unwrap();
    let rules = member
        .facade
        .get_security_rules(&order_id, &user)
        .await
        .unwrap();
    assert!(rules.is_empty());

    engine.shutdown().await;
}

#[tokio::test]
async fn security_rules_are_rejected_on_non_network_orders() {
    let network = InProcessNetwork::new();
    let member = TestMember::quick("member-a", &network);
    let user = member.user("alice");

    let order_id = member
        .facade
        .activate_order(fcb_testkit::volume_request(10), None, None, &user)
        .await
        .unwrap();
    let err = member
        .facade
        .create_security_rule(&order_id, ssh_rule(), &user)
        .await
        .unwrap_err();
    assert!(matches!(err, fcb_schemas::BrokerError::Inconsistent(_)));
}
