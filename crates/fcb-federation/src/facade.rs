use fcb_core::{AuthorizationPlugin, OrderController, StateTransitioner};
use fcb_schemas::{
    BrokerError, BrokerOperation, GenericResponse, Image, MemberId, OperationKind, OrderEvent,
    OrderEventKind, OrderId, OrderInstance, OrderRecord, OrderState, ResourceQuota, ResourceType,
    SecurityRule, SystemUser,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// The surface one member exposes to its peers.
///
/// Most entry points execute at the providing member on behalf of a remote
/// requester: each re-validates order consistency (the requesting member
/// must be the order's recorded requester, this member its provider),
/// ownership and resource type, authorizes, and then forwards to the same
/// controller a local call would hit. `handle_remote_event` is the
/// requester-side half of the synchronization protocol.
///
/// Principals arrive already authenticated by the requesting member; the
/// transport vouches for the sender's member identity.
pub struct RemoteFacade {
    controller: Arc<OrderController>,
    transitioner: Arc<StateTransitioner>,
    auth: Arc<dyn AuthorizationPlugin>,
    local_member: MemberId,
}

impl RemoteFacade {
    pub fn new(
        controller: Arc<OrderController>,
        transitioner: Arc<StateTransitioner>,
        auth: Arc<dyn AuthorizationPlugin>,
    ) -> Self {
        let local_member = controller.local_member().clone();
        Self {
            controller,
            transitioner,
            auth,
            local_member,
        }
    }

    pub fn local_member(&self) -> &MemberId {
        &self.local_member
    }

    fn check_order_consistency(
        &self,
        record: &OrderRecord,
        requesting_member: &MemberId,
    ) -> Result<(), BrokerError> {
        if &record.requester != requesting_member {
            return Err(BrokerError::Inconsistent(format!(
                "member {requesting_member} is not the requester of order {}",
                record.id
            )));
        }
        if !record.is_provider_local(&self.local_member) {
            return Err(BrokerError::NotFound(format!(
                "order {} is not provided by this member",
                record.id
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Provider-side entry points
    // -----------------------------------------------------------------------

    /// Create the provider-side copy of a remotely-requested order and run
    /// it through this member's own lifecycle.
    pub async fn activate_order(
        &self,
        requesting_member: &MemberId,
        order: OrderRecord,
    ) -> Result<(), BrokerError> {
        self.check_order_consistency(&order, requesting_member)?;
        self.auth.is_authorized(
            &order.system_user,
            &BrokerOperation::on_cloud(
                OperationKind::Create,
                order.resource_type(),
                order.cloud_name.clone(),
            ),
        )?;
        self.controller.activate_prepared(order)?;
        Ok(())
    }

    pub async fn get_resource_instance(
        &self,
        requesting_member: &MemberId,
        order_id: &OrderId,
        user: &SystemUser,
        resource_type: ResourceType,
    ) -> Result<OrderInstance, BrokerError> {
        let order = self.controller.get_order(order_id, user, resource_type).await?;
        {
            let record = order.lock().await;
            self.check_order_consistency(&record, requesting_member)?;
        }
        self.auth.is_authorized(
            user,
            &BrokerOperation::new(OperationKind::Get, resource_type),
        )?;
        self.controller.get_resource_instance(&order).await
    }

    pub async fn delete_order(
        &self,
        requesting_member: &MemberId,
        order_id: &OrderId,
        user: &SystemUser,
        resource_type: ResourceType,
    ) -> Result<(), BrokerError> {
        let order = self.controller.get_order(order_id, user, resource_type).await?;
        {
            let record = order.lock().await;
            self.check_order_consistency(&record, requesting_member)?;
        }
        self.auth.is_authorized(
            user,
            &BrokerOperation::new(OperationKind::Delete, resource_type),
        )?;
        self.controller.delete_order(&order).await
    }

    pub async fn get_user_quota(
        &self,
        cloud_name: &str,
        user: &SystemUser,
    ) -> Result<ResourceQuota, BrokerError> {
        self.auth.is_authorized(
            user,
            &BrokerOperation::on_cloud(
                OperationKind::GetUserQuota,
                ResourceType::Quota,
                cloud_name,
            ),
        )?;
        self.controller
            .factory()
            .local(cloud_name)?
            .user_quota(cloud_name, user)
            .await
    }

    pub async fn get_image(
        &self,
        cloud_name: &str,
        image_id: &str,
        user: &SystemUser,
    ) -> Result<Image, BrokerError> {
        self.auth.is_authorized(
            user,
            &BrokerOperation::on_cloud(OperationKind::Get, ResourceType::Image, cloud_name),
        )?;
        self.controller
            .factory()
            .local(cloud_name)?
            .image(cloud_name, image_id, user)
            .await
    }

    pub async fn get_all_images(
        &self,
        cloud_name: &str,
        user: &SystemUser,
    ) -> Result<HashMap<String, String>, BrokerError> {
        self.auth.is_authorized(
            user,
            &BrokerOperation::on_cloud(OperationKind::GetAll, ResourceType::Image, cloud_name),
        )?;
        self.controller
            .factory()
            .local(cloud_name)?
            .all_images(cloud_name, user)
            .await
    }

    pub async fn generic_request(
        &self,
        cloud_name: &str,
        body: &str,
        user: &SystemUser,
    ) -> Result<GenericResponse, BrokerError> {
        self.auth.is_authorized(
            user,
            &BrokerOperation::on_cloud(
                OperationKind::GenericRequest,
                ResourceType::Generic,
                cloud_name,
            ),
        )?;
        self.controller
            .factory()
            .local(cloud_name)?
            .generic_request(cloud_name, body, user)
            .await
    }

    pub async fn get_cloud_names(&self, user: &SystemUser) -> Result<Vec<String>, BrokerError> {
        self.auth.is_authorized(
            user,
            &BrokerOperation::new(OperationKind::Get, ResourceType::CloudNames),
        )?;
        Ok(self.controller.factory().catalog().cloud_names())
    }

    pub async fn create_security_rule(
        &self,
        requesting_member: &MemberId,
        order_id: &OrderId,
        rule: SecurityRule,
        user: &SystemUser,
    ) -> Result<String, BrokerError> {
        let order = self.rule_order(requesting_member, order_id, user).await?;
        let record = order.lock().await;
        self.auth.is_authorized(
            user,
            &BrokerOperation::on_cloud(
                OperationKind::Create,
                ResourceType::SecurityRule,
                record.cloud_name.clone(),
            ),
        )?;
        let connector = self.controller.factory().for_record(&record)?;
        connector.create_security_rule(&record, rule, user).await
    }

    pub async fn get_security_rules(
        &self,
        requesting_member: &MemberId,
        order_id: &OrderId,
        user: &SystemUser,
    ) -> Result<Vec<SecurityRule>, BrokerError> {
        let order = self.rule_order(requesting_member, order_id, user).await?;
        let record = order.lock().await;
        self.auth.is_authorized(
            user,
            &BrokerOperation::on_cloud(
                OperationKind::GetAll,
                ResourceType::SecurityRule,
                record.cloud_name.clone(),
            ),
        )?;
        let connector = self.controller.factory().for_record(&record)?;
        connector.security_rules(&record, user).await
    }

    pub async fn delete_security_rule(
        &self,
        cloud_name: &str,
        rule_id: &str,
        user: &SystemUser,
    ) -> Result<(), BrokerError> {
        self.auth.is_authorized(
            user,
            &BrokerOperation::on_cloud(
                OperationKind::Delete,
                ResourceType::SecurityRule,
                cloud_name,
            ),
        )?;
        self.controller
            .factory()
            .local(cloud_name)?
            .delete_security_rule(cloud_name, rule_id, user)
            .await
    }

    async fn rule_order(
        &self,
        requesting_member: &MemberId,
        order_id: &OrderId,
        user: &SystemUser,
    ) -> Result<Arc<fcb_core::Order>, BrokerError> {
        let order = self.controller.get_order_unchecked(order_id)?;
        {
            let record = order.lock().await;
            self.check_order_consistency(&record, requesting_member)?;
            if !record.system_user.same_principal(user) {
                return Err(BrokerError::Unauthorized(format!(
                    "user {} does not own order {order_id}",
                    user.id
                )));
            }
            if !matches!(
                record.resource_type(),
                ResourceType::Network | ResourceType::PublicIp
            ) {
                return Err(BrokerError::Inconsistent(format!(
                    "order {order_id} is a {} order; security rules attach to network and public ip orders",
                    record.resource_type()
                )));
            }
        }
        Ok(order)
    }

    // -----------------------------------------------------------------------
    // Requester-side event handling
    // -----------------------------------------------------------------------

    /// Apply a provider-pushed state change to the local copy of a remote
    /// order.
    ///
    /// The signalling member must be the order's recorded provider;
    /// anything else is a protocol violation and is rejected, never
    /// applied. Under the order's lock, an event arriving after the order
    /// already left PENDING (deleted locally, or already updated) is a
    /// stale duplicate and discards as a no-op, which is what makes
    /// provider-side retransmission safe.
    pub async fn handle_remote_event(
        &self,
        signalling_member: &MemberId,
        event: &OrderEvent,
    ) -> Result<(), BrokerError> {
        let order = self.controller.get_order_unchecked(&event.order_id)?;
        let mut record = order.lock().await;

        if &record.provider != signalling_member {
            warn!(
                order_id = %record.id,
                signalling = %signalling_member,
                provider = %record.provider,
                "event from a member that is not the order's provider; rejected"
            );
            return Err(BrokerError::Inconsistent(format!(
                "signalling member {signalling_member} does not match the provider of order {}",
                record.id
            )));
        }

        if record.state != OrderState::Pending {
            debug!(
                order_id = %record.id,
                state = %record.state,
                "stale order event discarded"
            );
            return Ok(());
        }

        record.apply_provider_snapshot(&event.snapshot);
        let next = match event.kind {
            OrderEventKind::InstanceFulfilled => OrderState::Fulfilled,
            OrderEventKind::InstanceFailed => OrderState::FailedAfterSuccessfulRequest,
        };
        self.transitioner.transition(&order, &mut record, next);
        Ok(())
    }
}
