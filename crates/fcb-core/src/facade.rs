use crate::auth::AuthorizationPlugin;
use crate::connector::PeerClient;
use crate::controller::OrderController;
use crate::order::Order;
use fcb_schemas::{
    BrokerError, BrokerOperation, GenericResponse, Image, MemberId, OperationKind, OrderId,
    OrderInstance, PeerRequest, PeerResponse, ResourceQuota, ResourceRequest, ResourceType,
    SecurityRule, SystemUser,
};
use std::collections::HashMap;
use std::sync::Arc;

/// The user-facing surface of one broker member, used by whatever binds
/// requests (HTTP, CLI, tests). Callers arrive already authenticated; this
/// facade enforces ownership (through the controller) and consults the
/// authorization plugin before every operation.
pub struct LocalFacade {
    controller: Arc<OrderController>,
    auth: Arc<dyn AuthorizationPlugin>,
    peer_client: Arc<dyn PeerClient>,
}

impl LocalFacade {
    pub fn new(
        controller: Arc<OrderController>,
        auth: Arc<dyn AuthorizationPlugin>,
        peer_client: Arc<dyn PeerClient>,
    ) -> Self {
        Self {
            controller,
            auth,
            peer_client,
        }
    }

    pub fn controller(&self) -> &Arc<OrderController> {
        &self.controller
    }

    pub fn local_member(&self) -> &MemberId {
        self.controller.local_member()
    }

    fn is_local(&self, member: &MemberId) -> bool {
        member == self.controller.local_member()
    }

    // -----------------------------------------------------------------------
    // Orders
    // -----------------------------------------------------------------------

    pub async fn activate_order(
        &self,
        resource: ResourceRequest,
        provider: Option<MemberId>,
        cloud_name: Option<String>,
        user: &SystemUser,
    ) -> Result<OrderId, BrokerError> {
        let operation = match &cloud_name {
            Some(cloud) => BrokerOperation::on_cloud(
                OperationKind::Create,
                resource.resource_type(),
                cloud.clone(),
            ),
            None => BrokerOperation::new(OperationKind::Create, resource.resource_type()),
        };
        self.auth.is_authorized(user, &operation)?;
        self.controller
            .activate_order(resource, provider, cloud_name, user)
    }

    pub async fn get_resource_instance(
        &self,
        order_id: &OrderId,
        user: &SystemUser,
        resource_type: ResourceType,
    ) -> Result<OrderInstance, BrokerError> {
        let order = self.controller.get_order(order_id, user, resource_type).await?;
        let cloud = order.lock().await.cloud_name.clone();
        self.auth.is_authorized(
            user,
            &BrokerOperation::on_cloud(OperationKind::Get, resource_type, cloud),
        )?;
        self.controller.get_resource_instance(&order).await
    }

    pub async fn delete_order(
        &self,
        order_id: &OrderId,
        user: &SystemUser,
        resource_type: ResourceType,
    ) -> Result<(), BrokerError> {
        let order = self.controller.get_order(order_id, user, resource_type).await?;
        let cloud = order.lock().await.cloud_name.clone();
        self.auth.is_authorized(
            user,
            &BrokerOperation::on_cloud(OperationKind::Delete, resource_type, cloud),
        )?;
        self.controller.delete_order(&order).await
    }

    pub async fn stop_order(&self, order_id: &OrderId, user: &SystemUser) -> Result<(), BrokerError> {
        let order = self
            .controller
            .get_order(order_id, user, ResourceType::Compute)
            .await?;
        let cloud = order.lock().await.cloud_name.clone();
        self.auth.is_authorized(
            user,
            &BrokerOperation::on_cloud(OperationKind::Stop, ResourceType::Compute, cloud),
        )?;
        self.controller.stop_order(&order).await
    }

    // -----------------------------------------------------------------------
    // Cloud-scoped queries (local member or a remote one)
    // -----------------------------------------------------------------------

    pub async fn get_user_quota(
        &self,
        member: &MemberId,
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
        if self.is_local(member) {
            self.controller
                .factory()
                .local(cloud_name)?
                .user_quota(cloud_name, user)
                .await
        } else {
            self.controller
                .factory()
                .remote(member)
                .user_quota(cloud_name, user)
                .await
        }
    }

    pub async fn get_image(
        &self,
        member: &MemberId,
        cloud_name: &str,
        image_id: &str,
        user: &SystemUser,
    ) -> Result<Image, BrokerError> {
        self.auth.is_authorized(
            user,
            &BrokerOperation::on_cloud(OperationKind::Get, ResourceType::Image, cloud_name),
        )?;
        if self.is_local(member) {
            self.controller
                .factory()
                .local(cloud_name)?
                .image(cloud_name, image_id, user)
                .await
        } else {
            self.controller
                .factory()
                .remote(member)
                .image(cloud_name, image_id, user)
                .await
        }
    }

    pub async fn get_all_images(
        &self,
        member: &MemberId,
        cloud_name: &str,
        user: &SystemUser,
    ) -> Result<HashMap<String, String>, BrokerError> {
        self.auth.is_authorized(
            user,
            &BrokerOperation::on_cloud(OperationKind::GetAll, ResourceType::Image, cloud_name),
        )?;
        if self.is_local(member) {
            self.controller
                .factory()
                .local(cloud_name)?
                .all_images(cloud_name, user)
                .await
        } else {
            self.controller
                .factory()
                .remote(member)
                .all_images(cloud_name, user)
                .await
        }
    }

    pub async fn generic_request(
        &self,
        member: &MemberId,
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
        if self.is_local(member) {
            self.controller
                .factory()
                .local(cloud_name)?
                .generic_request(cloud_name, body, user)
                .await
        } else {
            self.controller
                .factory()
                .remote(member)
                .generic_request(cloud_name, body, user)
                .await
        }
    }

    pub async fn get_cloud_names(
        &self,
        member: &MemberId,
        user: &SystemUser,
    ) -> Result<Vec<String>, BrokerError> {
        self.auth.is_authorized(
            user,
            &BrokerOperation::new(OperationKind::Get, ResourceType::CloudNames),
        )?;
        if self.is_local(member) {
            return Ok(self.controller.factory().catalog().cloud_names());
        }
        let response = self
            .peer_client
            .call(member, PeerRequest::GetCloudNames { user: user.clone() })
            .await?;
        match response {
            PeerResponse::CloudNames { clouds } => Ok(clouds),
            other => Err(BrokerError::Unexpected(format!(
                "malformed peer response: {other:?}"
            ))),
        }
    }

    // -----------------------------------------------------------------------
    // Security rules
    // -----------------------------------------------------------------------

    /// Resolve a rule-bearing order (network or public ip), enforcing
    /// ownership before any policy check.
    async fn rule_order(
        &self,
        order_id: &OrderId,
        user: &SystemUser,
    ) -> Result<Arc<Order>, BrokerError> {
        let order = self.controller.get_order_unchecked(order_id)?;
        {
            let record = order.lock().await;
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

    pub async fn create_security_rule(
        &self,
        order_id: &OrderId,
        rule: SecurityRule,
        user: &SystemUser,
    ) -> Result<String, BrokerError> {
        let order = self.rule_order(order_id, user).await?;
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
        order_id: &OrderId,
        user: &SystemUser,
    ) -> Result<Vec<SecurityRule>, BrokerError> {
        let order = self.rule_order(order_id, user).await?;
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
        member: &MemberId,
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
        if self.is_local(member) {
            self.controller
                .factory()
                .local(cloud_name)?
                .delete_security_rule(cloud_name, rule_id, user)
                .await
        } else {
            self.controller
                .factory()
                .remote(member)
                .delete_security_rule(cloud_name, rule_id, user)
                .await
        }
    }
}
