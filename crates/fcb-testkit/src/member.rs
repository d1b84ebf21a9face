use crate::network::{InProcessNetwork, InProcessPeerClient};
use fcb_audit::NullAuditSink;
use fcb_cloud::{CloudCatalog, EmulatedCloud};
use fcb_core::{
    AllowAllPlugin, ConnectorFactory, Engine, EngineHandle, EngineSettings, InMemoryOrderStore,
    LocalFacade, OrderController, OrderRegistry, StateTransitioner,
};
use fcb_federation::{RemoteEventNotifier, RemoteFacade};
use fcb_schemas::{
    ComputeRequest, MemberId, NetworkAllocationMode, NetworkRequest, ResourceRequest, SystemUser,
    VolumeRequest,
};
use std::sync::Arc;
use std::time::Duration;

/// One fully wired broker member: emulated cloud, in-memory store, engine,
/// both facades, attached to an in-process federation.
pub struct TestMember {
    pub member_id: MemberId,
    pub cloud: Arc<EmulatedCloud>,
    pub registry: Arc<OrderRegistry>,
    pub store: Arc<InMemoryOrderStore>,
    pub transitioner: Arc<StateTransitioner>,
    pub controller: Arc<OrderController>,
    pub facade: Arc<LocalFacade>,
    pub remote_facade: Arc<RemoteFacade>,
    engine: Engine,
}

impl TestMember {
    /// Build a member and register it on the network. The engine is not
    /// running yet; call [`TestMember::start_engine`].
    pub fn new(
        member_id: &str,
        network: &Arc<InProcessNetwork>,
        settings: EngineSettings,
    ) -> Arc<Self> {
        let member_id = MemberId::from(member_id);
        let cloud = Arc::new(EmulatedCloud::new("default"));
        let catalog = Arc::new(CloudCatalog::new("default").register(cloud.clone()));

        let peer_client: Arc<InProcessPeerClient> = Arc::new(InProcessPeerClient::new(
            network.clone(),
            member_id.clone(),
        ));

        let factory = Arc::new(ConnectorFactory::new(
            member_id.clone(),
            catalog,
            Arc::new(NullAuditSink),
            peer_client.clone(),
            Duration::from_millis(500),
        ));

        let registry = Arc::new(OrderRegistry::new());
        let store = Arc::new(InMemoryOrderStore::new());
        let notifier = Arc::new(
            RemoteEventNotifier::new(peer_client.clone())
                .with_retry(5, Duration::from_millis(20)),
        );
        let transitioner = Arc::new(StateTransitioner::new(
            registry.clone(),
            store.clone(),
            notifier,
            member_id.clone(),
        ));
        let controller = Arc::new(OrderController::new(
            registry.clone(),
            transitioner.clone(),
            factory.clone(),
            member_id.clone(),
            "default",
        ));
        let auth = Arc::new(AllowAllPlugin);
        let facade = Arc::new(LocalFacade::new(
            controller.clone(),
            auth.clone(),
            peer_client,
        ));
        let remote_facade = Arc::new(RemoteFacade::new(
            controller.clone(),
            transitioner.clone(),
            auth,
        ));
        network.register(&member_id, remote_facade.clone());

        let engine = Engine::new(
            registry.clone(),
            transitioner.clone(),
            factory,
            member_id.clone(),
            settings,
        );

        Arc::new(Self {
            member_id,
            cloud,
            registry,
            store,
            transitioner,
            controller,
            facade,
            remote_facade,
            engine,
        })
    }

    /// Member with the fast default test settings (10ms polls).
    pub fn quick(member_id: &str, network: &Arc<InProcessNetwork>) -> Arc<Self> {
        Self::new(
            member_id,
            network,
            EngineSettings::uniform(Duration::from_millis(10)),
        )
    }

    pub fn start_engine(&self) -> EngineHandle {
        self.engine.start()
    }

    /// A principal authenticated at this member.
    pub fn user(&self, id: &str) -> SystemUser {
        SystemUser::new(id, id, self.member_id.clone())
    }
}

// ---------------------------------------------------------------------------
// Resource request fixtures
// ---------------------------------------------------------------------------

pub fn compute_request() -> ResourceRequest {
    ResourceRequest::Compute(ComputeRequest {
        name: Some("worker".to_string()),
        vcpu: 2,
        memory_mb: 2_048,
        disk_gb: 20,
        image_id: "image-0001".to_string(),
        public_key: None,
        network_order_ids: Vec::new(),
    })
}

pub fn volume_request(size_gb: u64) -> ResourceRequest {
    ResourceRequest::Volume(VolumeRequest {
        name: None,
        size_gb,
    })
}

pub fn network_request() -> ResourceRequest {
    ResourceRequest::Network(NetworkRequest {
        name: None,
        cidr: "10.40.0.0/24".to_string(),
        gateway: "10.40.0.1".to_string(),
        allocation_mode: NetworkAllocationMode::Dynamic,
    })
}
