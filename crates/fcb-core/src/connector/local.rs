use super::{CloudConnector, Result};
use fcb_audit::{AuditEntry, AuditSink};
use fcb_cloud::CloudPlugin;
use fcb_schemas::{
    AttachmentInstance, BrokerError, ComputeInstance, GenericResponse, Image, InstanceState,
    NetworkInstance, OperationKind, OrderInstance, OrderRecord, OrderState, PublicIpInstance,
    ResourceQuota, ResourceRequest, SecurityRule, SystemUser, VolumeInstance,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Connector that forwards to the in-process cloud plugin registered for
/// the order's cloud.
///
/// Broker-level instance classification happens here, not in the plugin:
/// the raw backend status string is run through the plugin's `has_failed` /
/// `is_ready` / `is_stopped` hooks and stamped onto the instance. When the
/// connector carries an audit sink, every operation is recorded with its
/// outcome; the engine's own polling runs through an unaudited instance.
pub struct LocalCloudConnector {
    plugin: Arc<dyn CloudPlugin>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl LocalCloudConnector {
    pub fn new(plugin: Arc<dyn CloudPlugin>, audit: Option<Arc<dyn AuditSink>>) -> Self {
        Self { plugin, audit }
    }

    fn audit_order_op<T>(
        &self,
        record: &OrderRecord,
        operation: OperationKind,
        result: &Result<T>,
    ) {
        if let Some(sink) = &self.audit {
            sink.record(AuditEntry {
                user_id: record.system_user.id.clone(),
                operation,
                resource: record.resource_type(),
                cloud_name: record.cloud_name.clone(),
                order_id: Some(record.id.clone()),
                outcome: outcome_of(result),
            });
        }
    }

    fn audit_cloud_op<T>(
        &self,
        user: &SystemUser,
        operation: OperationKind,
        resource: fcb_schemas::ResourceType,
        cloud_name: &str,
        result: &Result<T>,
    ) {
        if let Some(sink) = &self.audit {
            sink.record(AuditEntry {
                user_id: user.id.clone(),
                operation,
                resource,
                cloud_name: cloud_name.to_string(),
                order_id: None,
                outcome: outcome_of(result),
            });
        }
    }

    fn classify(&self, backend_state: &str) -> InstanceState {
        if self.plugin.has_failed(backend_state) {
            InstanceState::Failed
        } else if self.plugin.is_stopped(backend_state) {
            InstanceState::Stopped
        } else if self.plugin.is_ready(backend_state) {
            InstanceState::Ready
        } else {
            InstanceState::Creating
        }
    }
}

fn outcome_of<T>(result: &Result<T>) -> String {
    match result {
        Ok(_) => "ok".to_string(),
        Err(err) => format!("{:?}", err.kind()),
    }
}

/// Instance synthesized for an order whose backend request has not produced
/// an id yet. Mirrors the order's own progress instead of asking the cloud.
fn placeholder_instance(record: &OrderRecord) -> OrderInstance {
    let state = match record.state {
        OrderState::Open | OrderState::Pending => InstanceState::Dispatched,
        OrderState::Failed => InstanceState::Failed,
        _ => InstanceState::Unknown,
    };
    let backend_state = String::new();
    match &record.resource {
        ResourceRequest::Compute(req) => OrderInstance::Compute(ComputeInstance {
            id: String::new(),
            state,
            backend_state,
            name: req.name.clone().unwrap_or_default(),
            vcpu: req.vcpu,
            ram_mb: req.memory_mb,
            disk_gb: req.disk_gb,
            ip_addresses: Vec::new(),
            image_id: req.image_id.clone(),
        }),
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

#[async_trait::async_trait]
impl CloudConnector for LocalCloudConnector {
    async fn request_instance(&self, record: &OrderRecord) -> Result<Option<String>> {
        let result = self
            .plugin
            .request_instance(&record.resource, &record.system_user)
            .await;
        self.audit_order_op(record, OperationKind::Create, &result);
        result.map(Some)
    }

    async fn get_instance(&self, record: &OrderRecord) -> Result<OrderInstance> {
        let result = match &record.instance_id {
            None => Ok(placeholder_instance(record)),
            Some(instance_id) => {
                self.plugin
                    .get_instance(instance_id, record.resource_type(), &record.system_user)
                    .await
                    .map(|mut instance| {
                        let state = self.classify(instance.backend_state());
                        instance.set_state(state);
                        instance
                    })
            }
        };
        self.audit_order_op(record, OperationKind::Get, &result);
        result
    }

    async fn delete_instance(&self, record: &OrderRecord) -> Result<()> {
        let result = match &record.instance_id {
            // Nothing was ever provisioned; deletion is trivially done.
            None => Ok(()),
            Some(instance_id) => {
                self.plugin
                    .delete_instance(instance_id, record.resource_type(), &record.system_user)
                    .await
            }
        };
        self.audit_order_op(record, OperationKind::Delete, &result);
        result
    }

    async fn user_quota(&self, cloud_name: &str, user: &SystemUser) -> Result<ResourceQuota> {
        let result = self.plugin.user_quota(user).await;
        self.audit_cloud_op(
            user,
            OperationKind::GetUserQuota,
            fcb_schemas::ResourceType::Quota,
            cloud_name,
            &result,
        );
        result
    }

    async fn image(&self, cloud_name: &str, image_id: &str, user: &SystemUser) -> Result<Image> {
        let result = self.plugin.image(image_id, user).await;
        self.audit_cloud_op(
            user,
            OperationKind::Get,
            fcb_schemas::ResourceType::Image,
            cloud_name,
            &result,
        );
        result
    }

    async fn all_images(
        &self,
        cloud_name: &str,
        user: &SystemUser,
    ) -> Result<HashMap<String, String>> {
        let result = self.plugin.all_images(user).await;
        self.audit_cloud_op(
            user,
            OperationKind::GetAll,
            fcb_schemas::ResourceType::Image,
            cloud_name,
            &result,
        );
        result
    }

    async fn create_security_rule(
        &self,
        record: &OrderRecord,
        rule: SecurityRule,
        user: &SystemUser,
    ) -> Result<String> {
        let result = match &record.instance_id {
            None => Err(BrokerError::NotFound(format!(
                "order {} has no instance to attach a rule to",
                record.id
            ))),
            Some(instance_id) => {
                self.plugin
                    .create_security_rule(instance_id, rule, user)
                    .await
            }
        };
        self.audit_cloud_op(
            user,
            OperationKind::Create,
            fcb_schemas::ResourceType::SecurityRule,
            &record.cloud_name,
            &result,
        );
        result
    }

    async fn security_rules(
        &self,
        record: &OrderRecord,
        user: &SystemUser,
    ) -> Result<Vec<SecurityRule>> {
        let result = match &record.instance_id {
            None => Ok(Vec::new()),
            Some(instance_id) => self.plugin.security_rules(instance_id, user).await,
        };
        self.audit_cloud_op(
            user,
            OperationKind::GetAll,
            fcb_schemas::ResourceType::SecurityRule,
            &record.cloud_name,
            &result,
        );
        result
    }

    async fn delete_security_rule(
        &self,
        cloud_name: &str,
        rule_id: &str,
        user: &SystemUser,
    ) -> Result<()> {
        let result = self.plugin.delete_security_rule(rule_id, user).await;
        self.audit_cloud_op(
            user,
            OperationKind::Delete,
            fcb_schemas::ResourceType::SecurityRule,
            cloud_name,
            &result,
        );
        result
    }

    async fn generic_request(
        &self,
        cloud_name: &str,
        body: &str,
        user: &SystemUser,
    ) -> Result<GenericResponse> {
        let result = self.plugin.generic_request(body, user).await;
        self.audit_cloud_op(
            user,
            OperationKind::GenericRequest,
            fcb_schemas::ResourceType::Generic,
            cloud_name,
            &result,
        );
        result
    }
}
