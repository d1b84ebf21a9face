use super::{CloudConnector, PeerClient, Result};
use fcb_schemas::{
    BrokerError, GenericResponse, Image, MemberId, OrderInstance, OrderRecord, PeerRequest,
    PeerResponse, ResourceQuota, SecurityRule, SystemUser,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Connector that ships each operation to the order's providing member over
/// the peer transport.
///
/// Every round trip is bounded by `timeout`; an elapsed timer is a
/// connectivity failure (`Unavailable`), never an indefinite block. Typed
/// errors raised at the provider arrive through the transport unchanged, so
/// callers see the same error surface as on the local path.
pub struct RemoteCloudConnector {
    provider: MemberId,
    client: Arc<dyn PeerClient>,
    timeout: Duration,
}

impl RemoteCloudConnector {
    pub fn new(provider: MemberId, client: Arc<dyn PeerClient>, timeout: Duration) -> Self {
        Self {
            provider,
            client,
            timeout,
        }
    }

    async fn call(&self, request: PeerRequest) -> Result<PeerResponse> {
        match tokio::time::timeout(self.timeout, self.client.call(&self.provider, request)).await {
            Ok(result) => result,
            Err(_) => Err(BrokerError::Unavailable(format!(
                "request to member {} timed out",
                self.provider
            ))),
        }
    }

    fn protocol_violation(got: &PeerResponse) -> BrokerError {
        BrokerError::Unexpected(format!("malformed peer response: {got:?}"))
    }
}

#[async_trait::async_trait]
impl CloudConnector for RemoteCloudConnector {
    async fn request_instance(&self, record: &OrderRecord) -> Result<Option<String>> {
        let response = self
            .call(PeerRequest::ActivateOrder {
                order: record.clone(),
            })
            .await?;
        match response {
            // The instance id stays at the providing member.
            PeerResponse::Accepted => Ok(None),
            other => Err(Self::protocol_violation(&other)),
        }
    }

    async fn get_instance(&self, record: &OrderRecord) -> Result<OrderInstance> {
        let response = self
            .call(PeerRequest::GetInstance {
                order_id: record.id.clone(),
                resource_type: record.resource_type(),
                user: record.system_user.clone(),
            })
            .await?;
        match response {
            PeerResponse::Instance { instance } => Ok(instance),
            other => Err(Self::protocol_violation(&other)),
        }
    }

    async fn delete_instance(&self, record: &OrderRecord) -> Result<()> {
        let response = self
            .call(PeerRequest::DeleteOrder {
                order_id: record.id.clone(),
                resource_type: record.resource_type(),
                user: record.system_user.clone(),
            })
            .await?;
        match response {
            PeerResponse::Accepted => Ok(()),
            other => Err(Self::protocol_violation(&other)),
        }
    }

    async fn user_quota(&self, cloud_name: &str, user: &SystemUser) -> Result<ResourceQuota> {
        let response = self
            .call(PeerRequest::GetUserQuota {
                cloud_name: cloud_name.to_string(),
                user: user.clone(),
            })
            .await?;
        match response {
            PeerResponse::Quota { quota } => Ok(quota),
            other => Err(Self::protocol_violation(&other)),
        }
    }

    async fn image(&self, cloud_name: &str, image_id: &str, user: &SystemUser) -> Result<Image> {
        let response = self
            .call(PeerRequest::GetImage {
                cloud_name: cloud_name.to_string(),
                image_id: image_id.to_string(),
                user: user.clone(),
            })
            .await?;
        match response {
            PeerResponse::Image { image } => Ok(image),
            other => Err(Self::protocol_violation(&other)),
        }
    }

    async fn all_images(
        &self,
        cloud_name: &str,
        user: &SystemUser,
    ) -> Result<HashMap<String, String>> {
        let response = self
            .call(PeerRequest::GetAllImages {
                cloud_name: cloud_name.to_string(),
                user: user.clone(),
            })
            .await?;
        match response {
            PeerResponse::ImageCatalog { images } => Ok(images),
            other => Err(Self::protocol_violation(&other)),
        }
    }

    async fn create_security_rule(
        &self,
        record: &OrderRecord,
        rule: SecurityRule,
        user: &SystemUser,
    ) -> Result<String> {
        let response = self
            .call(PeerRequest::CreateSecurityRule {
                order_id: record.id.clone(),
                rule,
                user: user.clone(),
            })
            .await?;
        match response {
            PeerResponse::SecurityRuleId { rule_id } => Ok(rule_id),
            other => Err(Self::protocol_violation(&other)),
        }
    }

    async fn security_rules(
        &self,
        record: &OrderRecord,
        user: &SystemUser,
    ) -> Result<Vec<SecurityRule>> {
        let response = self
            .call(PeerRequest::GetSecurityRules {
                order_id: record.id.clone(),
                user: user.clone(),
            })
            .await?;
        match response {
            PeerResponse::SecurityRules { rules } => Ok(rules),
            other => Err(Self::protocol_violation(&other)),
        }
    }

    async fn delete_security_rule(
        &self,
        cloud_name: &str,
        rule_id: &str,
        user: &SystemUser,
    ) -> Result<()> {
        let response = self
            .call(PeerRequest::DeleteSecurityRule {
                cloud_name: cloud_name.to_string(),
                rule_id: rule_id.to_string(),
                user: user.clone(),
            })
            .await?;
        match response {
            PeerResponse::Accepted => Ok(()),
            other => Err(Self::protocol_violation(&other)),
        }
    }

    async fn generic_request(
        &self,
        cloud_name: &str,
        body: &str,
        user: &SystemUser,
    ) -> Result<GenericResponse> {
        let response = self
            .call(PeerRequest::GenericRequest {
                cloud_name: cloud_name.to_string(),
                body: body.to_string(),
                user: user.clone(),
            })
            .await?;
        match response {
            PeerResponse::Generic { response } => Ok(response),
            other => Err(Self::protocol_violation(&other)),
        }
    }
}
