use fcb_schemas::{
    BrokerError, GenericResponse, Image, OrderInstance, ResourceQuota, ResourceRequest,
    ResourceType, SecurityRule, SystemUser,
};
use std::collections::HashMap;

/// Convenience alias used throughout the plugin boundary.
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Contract every cloud backend adapter implements, one registered instance
/// per cloud name. Resource-type dispatch happens on the typed
/// [`ResourceRequest`] / [`ResourceType`] arguments.
///
/// # Contract
///
/// - `request_instance` returns the backend-assigned instance id and nothing
///   else; the engine records it on the order.
/// - `get_instance` returns the instance with its raw `backend_state`
///   string. Plugins do **not** set the broker-level
///   [`fcb_schemas::InstanceState`] classification; the local cloud
///   connector derives it through `is_ready` / `has_failed` / `is_stopped`
///   so broker semantics stay in one place.
/// - Errors are translated into the shared taxonomy at this boundary:
///   a missing instance is `NotFound`, an unreachable backend is
///   `Unavailable`, a capacity refusal is `NoAvailableResources`.
#[async_trait::async_trait]
pub trait CloudPlugin: Send + Sync {
    /// The cloud name this plugin serves (catalog key).
    fn cloud_name(&self) -> &str;

    async fn request_instance(
        &self,
        resource: &ResourceRequest,
        user: &SystemUser,
    ) -> Result<String>;

    async fn get_instance(
        &self,
        instance_id: &str,
        resource_type: ResourceType,
        user: &SystemUser,
    ) -> Result<OrderInstance>;

    async fn delete_instance(
        &self,
        instance_id: &str,
        resource_type: ResourceType,
        user: &SystemUser,
    ) -> Result<()>;

    /// Classify a raw backend status string as "instance is usable".
    fn is_ready(&self, backend_state: &str) -> bool;

    /// Classify a raw backend status string as "instance has failed".
    fn has_failed(&self, backend_state: &str) -> bool;

    /// Classify a raw backend status string as "compute instance stopped".
    /// Only meaningful for clouds that support the stop lifecycle.
    fn is_stopped(&self, _backend_state: &str) -> bool {
        false
    }

    async fn user_quota(&self, user: &SystemUser) -> Result<ResourceQuota>;

    async fn image(&self, image_id: &str, user: &SystemUser) -> Result<Image>;

    /// Catalog listing: image id -> image name.
    async fn all_images(&self, user: &SystemUser) -> Result<HashMap<String, String>>;

    async fn create_security_rule(
        &self,
        instance_id: &str,
        rule: SecurityRule,
        user: &SystemUser,
    ) -> Result<String>;

    async fn security_rules(
        &self,
        instance_id: &str,
        user: &SystemUser,
    ) -> Result<Vec<SecurityRule>>;

    async fn delete_security_rule(&self, rule_id: &str, user: &SystemUser) -> Result<()>;

    /// Opaque pass-through to the backend API for operations the broker has
    /// no first-class model for.
    async fn generic_request(&self, body: &str, user: &SystemUser) -> Result<GenericResponse>;
}
