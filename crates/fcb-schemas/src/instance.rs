use crate::state::InstanceState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Per-type instance shapes
// ---------------------------------------------------------------------------

/// Every instance carries the raw status string exactly as the backend
/// reported it (`backend_state`) next to the broker's own classification
/// (`state`). The classification is produced by the local cloud connector
/// using the plugin's `is_ready` / `has_failed` hooks, so a plugin never
/// decides broker semantics directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeInstance {
    pub id: String,
    pub state: InstanceState,
    pub backend_state: String,
    pub name: String,
    pub vcpu: u32,
    pub ram_mb: u64,
    pub disk_gb: u64,
    pub ip_addresses: Vec<String>,
    pub image_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInstance {
    pub id: String,
    pub state: InstanceState,
    pub backend_state: String,
    pub name: String,
    pub cidr: String,
    pub gateway: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeInstance {
    pub id: String,
    pub state: InstanceState,
    pub backend_state: String,
    pub name: String,
    pub size_gb: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentInstance {
    pub id: String,
    pub state: InstanceState,
    pub backend_state: String,
    pub compute_instance_id: String,
    pub volume_instance_id: String,
    pub device: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicIpInstance {
    pub id: String,
    pub state: InstanceState,
    pub backend_state: String,
    pub ip: String,
    pub compute_instance_id: String,
}

// ---------------------------------------------------------------------------
// OrderInstance
// ---------------------------------------------------------------------------

/// A concrete backend resource realized for an order, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderInstance {
    Compute(ComputeInstance),
    Network(NetworkInstance),
    Volume(VolumeInstance),
    Attachment(AttachmentInstance),
    PublicIp(PublicIpInstance),
}

impl OrderInstance {
    pub fn id(&self) -> &str {
        match self {
            OrderInstance::Compute(i) => &i.id,
            OrderInstance::Network(i) => &i.id,
            OrderInstance::Volume(i) => &i.id,
            OrderInstance::Attachment(i) => &i.id,
            OrderInstance::PublicIp(i) => &i.id,
        }
    }

    pub fn state(&self) -> InstanceState {
        match self {
            OrderInstance::Compute(i) => i.state,
            OrderInstance::Network(i) => i.state,
            OrderInstance::Volume(i) => i.state,
            OrderInstance::Attachment(i) => i.state,
            OrderInstance::PublicIp(i) => i.state,
        }
    }

    pub fn backend_state(&self) -> &str {
        match self {
            OrderInstance::Compute(i) => &i.backend_state,
            OrderInstance::Network(i) => &i.backend_state,
            OrderInstance::Volume(i) => &i.backend_state,
            OrderInstance::Attachment(i) => &i.backend_state,
            OrderInstance::PublicIp(i) => &i.backend_state,
        }
    }

    pub fn set_state(&mut self, state: InstanceState) {
        match self {
            OrderInstance::Compute(i) => i.state = state,
            OrderInstance::Network(i) => i.state = state,
            OrderInstance::Volume(i) => i.state = state,
            OrderInstance::Attachment(i) => i.state = state,
            OrderInstance::PublicIp(i) => i.state = state,
        }
    }
}

/// Free-form result of a plugin `generic_request` pass-through.
pub type GenericResponse = HashMap<String, String>;
