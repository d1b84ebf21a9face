use crate::resource::ResourceType;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OperationKind
// ---------------------------------------------------------------------------

/// What the caller is trying to do. Paired with a resource type and an
/// optional cloud name this is the unit the authorization plugin rules on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Create,
    Get,
    GetAll,
    Delete,
    Stop,
    GetUserQuota,
    GenericRequest,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OperationKind::Create => "create",
            OperationKind::Get => "get",
            OperationKind::GetAll => "get_all",
            OperationKind::Delete => "delete",
            OperationKind::Stop => "stop",
            OperationKind::GetUserQuota => "get_user_quota",
            OperationKind::GenericRequest => "generic_request",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// BrokerOperation
// ---------------------------------------------------------------------------

/// The operation descriptor consulted before every facade call:
/// `is_authorized(principal, operation)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerOperation {
    pub kind: OperationKind,
    pub resource: ResourceType,
    /// Target cloud, when the operation is cloud-scoped.
    pub cloud_name: Option<String>,
}

impl BrokerOperation {
    pub fn new(kind: OperationKind, resource: ResourceType) -> Self {
        Self {
            kind,
            resource,
            cloud_name: None,
        }
    }

    pub fn on_cloud(kind: OperationKind, resource: ResourceType, cloud: impl Into<String>) -> Self {
        Self {
            kind,
            resource,
            cloud_name: Some(cloud.into()),
        }
    }
}
