use crate::facade::RemoteFacade;
use fcb_schemas::{BrokerError, MemberId, PeerRequest, PeerResponse};

/// Transport-neutral server glue: map one peer request onto the remote
/// facade and produce the typed response. Every binding (HTTP, in-process)
/// funnels through here, so they cannot diverge in semantics.
///
/// `requesting_member` is the transport-authenticated sender; for event
/// notifications it doubles as the signalling member.
pub async fn serve_request(
    facade: &RemoteFacade,
    requesting_member: &MemberId,
    request: PeerRequest,
) -> Result<PeerResponse, BrokerError> {
    match request {
        PeerRequest::ActivateOrder { order } => {
            facade.activate_order(requesting_member, order).await?;
            Ok(PeerResponse::Accepted)
        }
        PeerRequest::GetInstance {
            order_id,
            resource_type,
            user,
        } => facade
            .get_resource_instance(requesting_member, &order_id, &user, resource_type)
            .await
            .map(|instance| PeerResponse::Instance { instance }),
        PeerRequest::DeleteOrder {
            order_id,
            resource_type,
            user,
        } => {
            facade
                .delete_order(requesting_member, &order_id, &user, resource_type)
                .await?;
            Ok(PeerResponse::Accepted)
        }
        PeerRequest::GetUserQuota { cloud_name, user } => facade
            .get_user_quota(&cloud_name, &user)
            .await
            .map(|quota| PeerResponse::Quota { quota }),
        PeerRequest::GetImage {
            cloud_name,
            image_id,
            user,
        } => facade
            .get_image(&cloud_name, &image_id, &user)
            .await
            .map(|image| PeerResponse::Image { image }),
        PeerRequest::GetAllImages { cloud_name, user } => facade
            .get_all_images(&cloud_name, &user)
            .await
            .map(|images| PeerResponse::ImageCatalog { images }),
        PeerRequest::CreateSecurityRule {
            order_id,
            rule,
            user,
        } => facade
            .create_security_rule(requesting_member, &order_id, rule, &user)
            .await
            .map(|rule_id| PeerResponse::SecurityRuleId { rule_id }),
        PeerRequest::GetSecurityRules { order_id, user } => facade
            .get_security_rules(requesting_member, &order_id, &user)
            .await
            .map(|rules| PeerResponse::SecurityRules { rules }),
        PeerRequest::DeleteSecurityRule {
            cloud_name,
            rule_id,
            user,
        } => {
            facade
                .delete_security_rule(&cloud_name, &rule_id, &user)
                .await?;
            Ok(PeerResponse::Accepted)
        }
        PeerRequest::GenericRequest {
            cloud_name,
            body,
            user,
        } => facade
            .generic_request(&cloud_name, &body, &user)
            .await
            .map(|response| PeerResponse::Generic { response }),
        PeerRequest::GetCloudNames { user } => facade
            .get_cloud_names(&user)
            .await
            .map(|clouds| PeerResponse::CloudNames { clouds }),
        PeerRequest::NotifyEvent { event } => {
            facade.handle_remote_event(requesting_member, &event).await?;
            Ok(PeerResponse::Accepted)
        }
    }
}
