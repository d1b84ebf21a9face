use crate::state::ComputeAllocation;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SecurityRule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityRuleDirection {
    Ingress,
    Egress,
}

/// Firewall rule attached to a network or public-ip instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRule {
    /// Backend-assigned id; empty on creation requests.
    pub id: String,
    pub direction: SecurityRuleDirection,
    pub protocol: String,
    pub port_from: u16,
    pub port_to: u16,
    pub cidr: String,
}

// ---------------------------------------------------------------------------
// ResourceQuota
// ---------------------------------------------------------------------------

/// A user's compute quota at one cloud: what the cloud grants, what the user
/// already holds, and the remainder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuota {
    pub total: ComputeAllocation,
    pub used: ComputeAllocation,
    pub available: ComputeAllocation,
}

impl ResourceQuota {
    pub fn new(total: ComputeAllocation, used: ComputeAllocation) -> Self {
        let available = ComputeAllocation {
            instances: total.instances.saturating_sub(used.instances),
            vcpu: total.vcpu.saturating_sub(used.vcpu),
            ram_mb: total.ram_mb.saturating_sub(used.ram_mb),
            disk_gb: total.disk_gb.saturating_sub(used.disk_gb),
        };
        Self {
            total,
            used,
            available,
        }
    }
}

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

/// A bootable image offered by a cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub name: String,
    pub size_bytes: u64,
    pub min_disk_gb: u64,
    pub min_ram_mb: u64,
    pub status: String,
}
