use crate::connector::ConnectorFactory;
use crate::order::Order;
use crate::registry::OrderRegistry;
use crate::transition::StateTransitioner;
use fcb_schemas::{
    AttachmentInstance, BrokerError, ComputeInstance, MemberId, NetworkInstance, OrderId,
    OrderInstance, OrderRecord, OrderState, PublicIpInstance, ResourceRequest, ResourceType,
    SystemUser, VolumeInstance,
};
use std::sync::Arc;
use tracing::info;

/// Validates and performs the order-facing operations. Shared by the local
/// facade and the member-to-member facade; neither path gets to bypass the
/// ownership and state checks here.
pub struct OrderController {
    registry: Arc<OrderRegistry>,
    transitioner: Arc<StateTransitioner>,
    factory: Arc<ConnectorFactory>,
    local_member: MemberId,
    default_cloud: String,
}

impl OrderController {
    pub fn new(
        registry: Arc<OrderRegistry>,
        transitioner: Arc<StateTransitioner>,
        factory: Arc<ConnectorFactory>,
        local_member: MemberId,
        default_cloud: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            transitioner,
            factory,
            local_member,
            default_cloud: default_cloud.into(),
        }
    }

    pub fn local_member(&self) -> &MemberId {
        &self.local_member
    }

    pub fn registry(&self) -> &Arc<OrderRegistry> {
        &self.registry
    }

    pub fn factory(&self) -> &Arc<ConnectorFactory> {
        &self.factory
    }

    // -----------------------------------------------------------------------
    // Activation
    // -----------------------------------------------------------------------

    /// Create and activate an order on behalf of a local user. The
    /// requester is always this member; the provider defaults to this
    /// member and the cloud to the configured default.
    pub fn activate_order(
        &self,
        resource: ResourceRequest,
        provider: Option<MemberId>,
        cloud_name: Option<String>,
        user: &SystemUser,
    ) -> Result<OrderId, BrokerError> {
        let provider = provider.unwrap_or_else(|| self.local_member.clone());
        let cloud_name = match cloud_name {
            Some(name) if !name.is_empty() => name,
            _ => self.default_cloud.clone(),
        };
        let record = OrderRecord::new(
            resource,
            self.local_member.clone(),
            provider,
            cloud_name,
            user.clone(),
        );
        let id = record.id.clone();
        let order = self.transitioner.activate(record)?;
        info!(order_id = %order.id(), "order accepted");
        Ok(id)
    }

    /// Activate an order whose record was built elsewhere; the
    /// member-to-member facade uses this for provider-side copies. The
    /// record arrives validated; only engine bookkeeping happens here.
    pub fn activate_prepared(&self, mut record: OrderRecord) -> Result<OrderId, BrokerError> {
        record.state = OrderState::Open;
        record.instance_id = None;
        let id = record.id.clone();
        self.transitioner.activate(record)?;
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Fetch an order, enforcing ownership and the endpoint/record resource
    /// type agreement. Ownership is a hard invariant checked before any
    /// authorization policy runs.
    pub async fn get_order(
        &self,
        id: &OrderId,
        user: &SystemUser,
        expected: ResourceType,
    ) -> Result<Arc<Order>, BrokerError> {
        let order = self
            .registry
            .get(id)
            .ok_or_else(|| BrokerError::NotFound(format!("order {id} not found")))?;
        {
            let record = order.lock().await;
            if !record.system_user.same_principal(user) {
                return Err(BrokerError::Unauthorized(format!(
                    "user {} does not own order {id}",
                    user.id
                )));
            }
            if record.resource_type() != expected {
                return Err(BrokerError::Inconsistent(format!(
                    "order {id} is a {} order, not {}",
                    record.resource_type(),
                    expected
                )));
            }
        }
        Ok(order)
    }

    /// Fetch an order by id only. For the requester-side event path, which
    /// validates the signalling member instead of a principal.
    pub fn get_order_unchecked(&self, id: &OrderId) -> Result<Arc<Order>, BrokerError> {
        self.registry
            .get(id)
            .ok_or_else(|| BrokerError::NotFound(format!("order {id} not found")))
    }

    // -----------------------------------------------------------------------
    // Instance reads
    // -----------------------------------------------------------------------

    /// The instance behind an order. Locally-provided orders query the
    /// cloud; remotely-provided orders answer from the snapshot the
    /// synchronization protocol maintains, so reads never cross the wire.
    pub async fn get_resource_instance(
        &self,
        order: &Arc<Order>,
    ) -> Result<OrderInstance, BrokerError> {
        let mut record = order.lock().await;
        if record.is_provider_local(&self.local_member) {
            let connector = self.factory.for_record(&record)?;
            let instance = connector.get_instance(&record).await?;
            record.cached_instance_state = instance.state();
            Ok(instance)
        } else {
            Ok(snapshot_instance(&record))
        }
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Close an order. Pre-provision orders close directly with no backend
    /// interaction. For remotely-provided orders the provider is told
    /// first, then the local copy closes; for locally-provided orders the
    /// closed processor performs the backend deletion before the order
    /// leaves the registry.
    pub async fn delete_order(&self, order: &Arc<Order>) -> Result<(), BrokerError> {
        let mut record = order.lock().await;
        if record.state == OrderState::Closed {
            return Err(BrokerError::InvalidParameter(format!(
                "order {} is already closed",
                record.id
            )));
        }
        if record.is_provider_remote(&self.local_member) && record.state != OrderState::Open {
            // The provider owns the backend instance; it must confirm
            // before the local copy may close.
            let connector = self.factory.for_record(&record)?;
            connector.delete_instance(&record).await?;
        }
        self.transitioner
            .transition(order, &mut record, OrderState::Closed);
        info!(order_id = %record.id, "order closed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Ask the backend to stop a fulfilled compute instance. The stopping
    /// processor then polls until the backend reports it stopped.
    pub async fn stop_order(&self, order: &Arc<Order>) -> Result<(), BrokerError> {
        let mut record = order.lock().await;
        if record.resource_type() != ResourceType::Compute {
            return Err(BrokerError::InvalidParameter(format!(
                "order {} is not a compute order",
                record.id
            )));
        }
        if record.is_provider_remote(&self.local_member) {
            return Err(BrokerError::InvalidParameter(format!(
                "order {} is provided by {}; stop is only supported for locally provided orders",
                record.id, record.provider
            )));
        }
        if record.state != OrderState::Fulfilled {
            return Err(BrokerError::InvalidParameter(format!(
                "order {} is {}, only FULFILLED orders can be stopped",
                record.id, record.state
            )));
        }
        self.transitioner
            .transition(order, &mut record, OrderState::Stopping);
        Ok(())
    }
}

/// Requester-side view of a remotely-provided order, built purely from the
/// provider-authoritative fields the synchronization protocol copied over.
/// The instance id is absent by design: it lives only at the provider.
fn snapshot_instance(record: &OrderRecord) -> OrderInstance {
    let state = record.cached_instance_state;
    let backend_state = String::new();
    match &record.resource {
        ResourceRequest::Compute(req) => {
            let allocation = record.actual_allocation.unwrap_or_default();
            OrderInstance::Compute(ComputeInstance {
                id: String::new(),
                state,
                backend_state,
                name: req.name.clone().unwrap_or_default(),
                vcpu: if allocation.vcpu > 0 { allocation.vcpu } else { req.vcpu },
                ram_mb: if allocation.ram_mb > 0 {
                    allocation.ram_mb
                } else {
                    req.memory_mb
                },
                disk_gb: if allocation.disk_gb > 0 {
                    allocation.disk_gb
                } else {
                    req.disk_gb
                },
                ip_addresses: Vec::new(),
                image_id: req.image_id.clone(),
            })
        }
        ResourceRequest::Network(req) => OrderInstance::Network(NetworkInstance {
            id: String::new(),
            state,
            backend_state,
            name: req.name.clone().unwrap_or_default(),
            cidr: req.cidr.clone(),
            gateway: req.gateway.clone(),
        }),
        ResourceRequest::Volume(req) => OrderInstance::Volume(VolumeInstance {
            id: String::new(),
            state,
            backend_state,
            name: req.name.clone().unwrap_or_default(),
            size_gb: req.size_gb,
        }),
        ResourceRequest::Attachment(req) => OrderInstance::Attachment(AttachmentInstance {
            id: String::new(),
            state,
            backend_state,
            compute_instance_id: req.compute_order_id.to_string(),
            volume_instance_id: req.volume_order_id.to_string(),
            device: req.device.clone(),
        }),
        ResourceRequest::PublicIp(req) => OrderInstance::PublicIp(PublicIpInstance {
            id: String::new(),
            state,
            backend_state,
            ip: String::new(),
            compute_instance_id: req.compute_order_id.to_string(),
        }),
    }
}
