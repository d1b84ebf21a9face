//! Member-to-member message contracts.
//!
//! Any transport that carries these shapes faithfully is a compliant
//! binding; the workspace ships an HTTP/JSON binding and an in-process
//! binding for tests. Every request names the resource type it expects so
//! the serving side can reject endpoint/record mismatches before touching
//! the order.

use crate::ids::{OrderId, SystemUser};
use crate::order::OrderRecord;
use crate::resource::ResourceType;
use crate::rules::SecurityRule;
use crate::state::{ComputeAllocation, InstanceState};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ProviderSnapshot
// ---------------------------------------------------------------------------

/// The provider-authoritative slice of an order, pushed to the requester
/// inside state-change events. `instance_id` is intentionally absent: it is
/// only meaningful at the providing member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    pub cached_instance_state: InstanceState,
    pub actual_allocation: Option<ComputeAllocation>,
    pub fault_message: Option<String>,
}

// ---------------------------------------------------------------------------
// OrderEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventKind {
    InstanceFulfilled,
    InstanceFailed,
}

/// Asynchronous notification pushed by a providing member to the requester
/// when a remotely-requested order reaches a post-request outcome.
/// Delivery is at-least-once; the receiving side discards stale duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub kind: OrderEventKind,
    pub snapshot: ProviderSnapshot,
}

// ---------------------------------------------------------------------------
// PeerRequest
// ---------------------------------------------------------------------------

/// A request from one federation member to another. The sender always
/// identifies itself at the transport layer; `user` is the principal the
/// sender already authenticated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerRequest {
    /// Create the provider-side copy of an order and run it through the
    /// provider's own lifecycle.
    ActivateOrder { order: OrderRecord },
    GetInstance {
        order_id: OrderId,
        resource_type: ResourceType,
        user: SystemUser,
    },
    DeleteOrder {
        order_id: OrderId,
        resource_type: ResourceType,
        user: SystemUser,
    },
    GetUserQuota {
        cloud_name: String,
        user: SystemUser,
    },
    GetImage {
        cloud_name: String,
        image_id: String,
        user: SystemUser,
    },
    GetAllImages {
        cloud_name: String,
        user: SystemUser,
    },
    CreateSecurityRule {
        order_id: OrderId,
        rule: SecurityRule,
        user: SystemUser,
    },
    GetSecurityRules {
        order_id: OrderId,
        user: SystemUser,
    },
    DeleteSecurityRule {
        cloud_name: String,
        rule_id: String,
        user: SystemUser,
    },
    GenericRequest {
        cloud_name: String,
        body: String,
        user: SystemUser,
    },
    GetCloudNames { user: SystemUser },
    /// Provider → requester push notification.
    NotifyEvent { event: OrderEvent },
}

// ---------------------------------------------------------------------------
// PeerResponse
// ---------------------------------------------------------------------------

/// Successful reply to a [`PeerRequest`]. Failures travel as a typed
/// [`crate::error::ErrorKind`] + message instead (see the transport
/// bindings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerResponse {
    Accepted,
    Instance { instance: crate::instance::OrderInstance },
    Quota { quota: crate::rules::ResourceQuota },
    Image { image: crate::rules::Image },
    ImageCatalog {
        /// image id -> image name
        images: std::collections::HashMap<String, String>,
    },
    SecurityRuleId { rule_id: String },
    SecurityRules { rules: Vec<SecurityRule> },
    Generic {
        response: crate::instance::GenericResponse,
    },
    CloudNames { clouds: Vec<String> },
}

impl PeerRequest {
    /// Short operation label for logs and the audit trail.
    pub fn label(&self) -> &'static str {
        match self {
            PeerRequest::ActivateOrder { .. } => "activate_order",
            PeerRequest::GetInstance { .. } => "get_instance",
            PeerRequest::DeleteOrder { .. } => "delete_order",
            PeerRequest::GetUserQuota { .. } => "get_user_quota",
            PeerRequest::GetImage { .. } => "get_image",
            PeerRequest::GetAllImages { .. } => "get_all_images",
            PeerRequest::CreateSecurityRule { .. } => "create_security_rule",
            PeerRequest::GetSecurityRules { .. } => "get_security_rules",
            PeerRequest::DeleteSecurityRule { .. } => "delete_security_rule",
            PeerRequest::GenericRequest { .. } => "generic_request",
            PeerRequest::GetCloudNames { .. } => "get_cloud_names",
            PeerRequest::NotifyEvent { .. } => "notify_event",
        }
    }
}
