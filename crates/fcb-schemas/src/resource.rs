use crate::ids::OrderId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ResourceType
// ---------------------------------------------------------------------------

/// Kind of resource an operation targets.
///
/// The first five are orderable; the rest only appear in authorization
/// operations and query paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Compute,
    Network,
    Volume,
    Attachment,
    PublicIp,
    Image,
    SecurityRule,
    Quota,
    CloudNames,
    Generic,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceType::Compute => "compute",
            ResourceType::Network => "network",
            ResourceType::Volume => "volume",
            ResourceType::Attachment => "attachment",
            ResourceType::PublicIp => "public_ip",
            ResourceType::Image => "image",
            ResourceType::SecurityRule => "security_rule",
            ResourceType::Quota => "quota",
            ResourceType::CloudNames => "cloud_names",
            ResourceType::Generic => "generic",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Per-type request attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeRequest {
    pub name: Option<String>,
    pub vcpu: u32,
    pub memory_mb: u64,
    pub disk_gb: u64,
    pub image_id: String,
    /// SSH public key installed on the instance, when given.
    pub public_key: Option<String>,
    /// Ids of network orders this compute attaches to.
    pub network_order_ids: Vec<OrderId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkAllocationMode {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRequest {
    pub name: Option<String>,
    pub cidr: String,
    pub gateway: String,
    pub allocation_mode: NetworkAllocationMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRequest {
    pub name: Option<String>,
    pub size_gb: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRequest {
    /// Order id of the compute the volume attaches to.
    pub compute_order_id: OrderId,
    /// Order id of the volume being attached.
    pub volume_order_id: OrderId,
    pub device: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIpRequest {
    /// Order id of the compute the address is bound to.
    pub compute_order_id: OrderId,
}

// ---------------------------------------------------------------------------
// ResourceRequest
// ---------------------------------------------------------------------------

/// The type-specific attributes of an order, tagged by resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceRequest {
    Compute(ComputeRequest),
    Network(NetworkRequest),
    Volume(VolumeRequest),
    Attachment(AttachmentRequest),
    PublicIp(PublicIpRequest),
}

impl ResourceRequest {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            ResourceRequest::Compute(_) => ResourceType::Compute,
            ResourceRequest::Network(_) => ResourceType::Network,
            ResourceRequest::Volume(_) => ResourceType::Volume,
            ResourceRequest::Attachment(_) => ResourceType::Attachment,
            ResourceRequest::PublicIp(_) => ResourceType::PublicIp,
        }
    }
}
