//! The dispatch abstraction that hides whether provisioning happens against
//! an in-process cloud plugin or on a remote federation member.
//!
//! [`ConnectorFactory::for_record`] resolves Local vs Remote purely by
//! comparing the order's provider with the local member id. That is the
//! single seam keeping the rest of the engine location-transparent; tests
//! substitute the [`PeerClient`] to fake the remote side.

mod local;
mod remote;

pub use local::LocalCloudConnector;
pub use remote::RemoteCloudConnector;

use fcb_audit::AuditSink;
use fcb_cloud::CloudCatalog;
use fcb_schemas::{
    BrokerError, GenericResponse, Image, MemberId, OrderInstance, OrderRecord, PeerRequest,
    PeerResponse, ResourceQuota, SecurityRule, SystemUser,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Convenience alias used throughout the connector boundary.
pub type Result<T> = std::result::Result<T, BrokerError>;

// ---------------------------------------------------------------------------
// CloudConnector
// ---------------------------------------------------------------------------

/// One provisioning surface, local or remote; callers are oblivious to
/// which.
#[async_trait::async_trait]
pub trait CloudConnector: Send + Sync {
    /// Issue the backend request for the order. Returns `Some(instance_id)`
    /// when provisioning ran on this member, `None` when the order was
    /// dispatched to its (remote) provider and the id stays there.
    async fn request_instance(&self, record: &OrderRecord) -> Result<Option<String>>;

    async fn get_instance(&self, record: &OrderRecord) -> Result<OrderInstance>;

    async fn delete_instance(&self, record: &OrderRecord) -> Result<()>;

    async fn user_quota(&self, cloud_name: &str, user: &SystemUser) -> Result<ResourceQuota>;

    async fn image(&self, cloud_name: &str, image_id: &str, user: &SystemUser) -> Result<Image>;

    async fn all_images(
        &self,
        cloud_name: &str,
        user: &SystemUser,
    ) -> Result<HashMap<String, String>>;

    async fn create_security_rule(
        &self,
        record: &OrderRecord,
        rule: SecurityRule,
        user: &SystemUser,
    ) -> Result<String>;

    async fn security_rules(
        &self,
        record: &OrderRecord,
        user: &SystemUser,
    ) -> Result<Vec<SecurityRule>>;

    async fn delete_security_rule(
        &self,
        cloud_name: &str,
        rule_id: &str,
        user: &SystemUser,
    ) -> Result<()>;

    async fn generic_request(
        &self,
        cloud_name: &str,
        body: &str,
        user: &SystemUser,
    ) -> Result<GenericResponse>;
}

// ---------------------------------------------------------------------------
// PeerClient
// ---------------------------------------------------------------------------

/// Transport seam for member-to-member requests. The HTTP binding lives in
/// `fcb-federation`; tests use an in-process implementation.
#[async_trait::async_trait]
pub trait PeerClient: Send + Sync {
    async fn call(&self, member: &MemberId, request: PeerRequest) -> Result<PeerResponse>;
}

/// Peer client for deployments with no federation configured: every remote
/// call reports the peer as unreachable.
pub struct UnreachablePeerClient;

#[async_trait::async_trait]
impl PeerClient for UnreachablePeerClient {
    async fn call(&self, member: &MemberId, _request: PeerRequest) -> Result<PeerResponse> {
        Err(BrokerError::Unavailable(format!(
            "no route to member {member}"
        )))
    }
}

// ---------------------------------------------------------------------------
// ConnectorFactory
// ---------------------------------------------------------------------------

/// Builds connectors for orders and cloud-scoped queries.
pub struct ConnectorFactory {
    local_member: MemberId,
    catalog: Arc<CloudCatalog>,
    audit: Arc<dyn AuditSink>,
    peer_client: Arc<dyn PeerClient>,
    remote_timeout: Duration,
}

impl ConnectorFactory {
    pub fn new(
        local_member: MemberId,
        catalog: Arc<CloudCatalog>,
        audit: Arc<dyn AuditSink>,
        peer_client: Arc<dyn PeerClient>,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            local_member,
            catalog,
            audit,
            peer_client,
            remote_timeout,
        }
    }

    pub fn local_member(&self) -> &MemberId {
        &self.local_member
    }

    pub fn catalog(&self) -> &Arc<CloudCatalog> {
        &self.catalog
    }

    /// Connector for the order, audited. Local when the order's provider is
    /// this member, remote otherwise.
    pub fn for_record(&self, record: &OrderRecord) -> Result<Arc<dyn CloudConnector>> {
        if record.is_provider_local(&self.local_member) {
            self.local(&record.cloud_name)
        } else {
            Ok(self.remote(&record.provider))
        }
    }

    /// Connector for the order with local auditing switched off. Used by
    /// the processors so automated polling does not flood the audit trail.
    pub fn for_record_unaudited(&self, record: &OrderRecord) -> Result<Arc<dyn CloudConnector>> {
        if record.is_provider_local(&self.local_member) {
            self.local_unaudited(&record.cloud_name)
        } else {
            Ok(self.remote(&record.provider))
        }
    }

    /// Audited local connector for a cloud of this member.
    pub fn local(&self, cloud_name: &str) -> Result<Arc<dyn CloudConnector>> {
        let plugin = self.catalog.plugin(cloud_name)?;
        Ok(Arc::new(LocalCloudConnector::new(
            plugin,
            Some(self.audit.clone()),
        )))
    }

    /// Local connector that skips the audit trail.
    pub fn local_unaudited(&self, cloud_name: &str) -> Result<Arc<dyn CloudConnector>> {
        let plugin = self.catalog.plugin(cloud_name)?;
        Ok(Arc::new(LocalCloudConnector::new(plugin, None)))
    }

    /// Connector that forwards every operation to the given member.
    pub fn remote(&self, provider: &MemberId) -> Arc<dyn CloudConnector> {
        Arc::new(RemoteCloudConnector::new(
            provider.clone(),
            self.peer_client.clone(),
            self.remote_timeout,
        ))
    }
}
