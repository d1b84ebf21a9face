use crate::ids::{MemberId, OrderId, SystemUser};
use crate::messages::ProviderSnapshot;
use crate::resource::{ResourceRequest, ResourceType};
use crate::state::{ComputeAllocation, InstanceState, OrderState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The persistent record behind one order.
///
/// This is plain serializable data: it crosses the wire inside
/// `ActivateOrder` requests, goes to the order store verbatim, and is what
/// the engine mutates under the order's lock. The engine-side handle that
/// owns the lock lives in `fcb-core`.
///
/// Field invariants (enforced by the engine, stated here because the record
/// travels): `id` is globally unique; `requester`, `provider` and
/// `system_user` never change after activation; `instance_id` is only ever
/// written at the providing member; `state` is only written by the state
/// transitioner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub resource: ResourceRequest,
    pub requester: MemberId,
    pub provider: MemberId,
    pub cloud_name: String,
    pub system_user: SystemUser,
    pub state: OrderState,
    pub instance_id: Option<String>,
    pub cached_instance_state: InstanceState,
    pub once_fault_message: Option<String>,
    pub actual_allocation: Option<ComputeAllocation>,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Build a record ready for activation. `state` starts at `Open` and
    /// `cached_instance_state` at `Dispatched`; the controller overrides
    /// requester/provider/cloud defaults before handing the record to the
    /// transitioner.
    pub fn new(
        resource: ResourceRequest,
        requester: MemberId,
        provider: MemberId,
        cloud_name: impl Into<String>,
        system_user: SystemUser,
    ) -> Self {
        Self {
            id: OrderId::random(),
            resource,
            requester,
            provider,
            cloud_name: cloud_name.into(),
            system_user,
            state: OrderState::Open,
            instance_id: None,
            cached_instance_state: InstanceState::Dispatched,
            once_fault_message: None,
            actual_allocation: None,
            created_at: Utc::now(),
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource.resource_type()
    }

    pub fn is_provider_local(&self, local: &MemberId) -> bool {
        &self.provider == local
    }

    pub fn is_provider_remote(&self, local: &MemberId) -> bool {
        !self.is_provider_local(local)
    }

    pub fn is_requester_local(&self, local: &MemberId) -> bool {
        &self.requester == local
    }

    /// Record a fault diagnostic. Sticky: the first message wins, later
    /// calls are ignored so the original cause survives retries.
    pub fn set_once_fault_message(&mut self, message: impl Into<String>) {
        if self.once_fault_message.is_none() {
            self.once_fault_message = Some(message.into());
        }
    }

    /// The provider-authoritative fields pushed to the requester on state
    /// change events.
    pub fn provider_snapshot(&self) -> ProviderSnapshot {
        ProviderSnapshot {
            cached_instance_state: self.cached_instance_state,
            actual_allocation: self.actual_allocation,
            fault_message: self.once_fault_message.clone(),
        }
    }

    /// Copy forward the fields the provider is authoritative for. Used by
    /// the requester-side event handler; `instance_id` is deliberately not
    /// part of the snapshot.
    pub fn apply_provider_snapshot(&mut self, snapshot: &ProviderSnapshot) {
        self.cached_instance_state = snapshot.cached_instance_state;
        if snapshot.actual_allocation.is_some() {
            self.actual_allocation = snapshot.actual_allocation;
        }
        if let Some(fault) = &snapshot.fault_message {
            self.set_once_fault_message(fault.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::VolumeRequest;

    fn volume_record() -> OrderRecord {
        OrderRecord::new(
            ResourceRequest::Volume(VolumeRequest {
                name: None,
                size_gb: 10,
            }),
            MemberId::from("member-a"),
            MemberId::from("member-b"),
            "default",
            SystemUser::new("u1", "user one", MemberId::from("member-a")),
        )
    }

    #[test]
    fn fault_message_is_sticky() {
        let mut rec = volume_record();
        rec.set_once_fault_message("first cause");
        rec.set_once_fault_message("later noise");
        assert_eq!(rec.once_fault_message.as_deref(), Some("first cause"));
    }

    #[test]
    fn locality_is_relative_to_member() {
        let rec = volume_record();
        assert!(rec.is_provider_local(&MemberId::from("member-b")));
        assert!(rec.is_provider_remote(&MemberId::from("member-a")));
        assert!(rec.is_requester_local(&MemberId::from("member-a")));
    }

    #[test]
    fn snapshot_does_not_erase_allocation() {
        let mut rec = volume_record();
        rec.actual_allocation = Some(ComputeAllocation {
            instances: 1,
            vcpu: 2,
            ram_mb: 2048,
            disk_gb: 20,
        });
        let empty = ProviderSnapshot {
            cached_instance_state: InstanceState::Ready,
            actual_allocation: None,
            fault_message: None,
        };
        rec.apply_provider_snapshot(&empty);
        assert!(rec.actual_allocation.is_some());
        assert_eq!(rec.cached_instance_state, InstanceState::Ready);
    }
}
