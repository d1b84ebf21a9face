//! Assembles one broker member from its configuration: cloud catalog,
//! audit sink, peer transport, registry, transitioner, controller, both
//! facades, and the engine. Everything is constructed here and injected;
//! no global state.

use anyhow::{Context, Result};
use fcb_audit::{AuditWriter, FileAuditSink, NullAuditSink};
use fcb_cloud::{CloudCatalog, EmulatedCloud};
use fcb_config::BrokerConfig;
use fcb_core::{
    AllowAllPlugin, ConnectorFactory, Engine, EngineSettings, InMemoryOrderStore, LocalFacade,
    OrderController, OrderRegistry, StateTransitioner,
};
use fcb_federation::{HttpPeerClient, RemoteEventNotifier, RemoteFacade};
use fcb_schemas::MemberId;
use std::sync::Arc;
use tracing::info;

/// One fully wired member, ready to start.
pub struct Member {
    pub member_id: MemberId,
    pub registry: Arc<OrderRegistry>,
    pub transitioner: Arc<StateTransitioner>,
    pub facade: Arc<LocalFacade>,
    pub remote_facade: Arc<RemoteFacade>,
    pub engine: Engine,
}

pub fn build_member(config: &BrokerConfig) -> Result<Member> {
    let member_id = MemberId::new(config.local_member_id.clone());

    // Every configured cloud is served by the emulated backend; real cloud
    // adapters register here instead.
    let mut catalog = CloudCatalog::new(config.default_cloud.clone());
    for cloud in &config.clouds {
        catalog = catalog.register(Arc::new(EmulatedCloud::new(cloud.clone()).with_auto_settle()));
    }
    let catalog = Arc::new(catalog);

    let audit: Arc<dyn fcb_audit::AuditSink> = match &config.audit_log_path {
        Some(path) => {
            let writer = AuditWriter::new(path, member_id.clone(), config.audit_hash_chain)
                .context("audit writer setup failed")?;
            Arc::new(FileAuditSink::new(writer))
        }
        None => Arc::new(NullAuditSink),
    };

    let peer_client = Arc::new(
        HttpPeerClient::new(
            member_id.clone(),
            config.peers.clone(),
            config.remote_request_timeout(),
        )
        .map_err(|err| anyhow::anyhow!("{err}"))?,
    );

    let factory = Arc::new(ConnectorFactory::new(
        member_id.clone(),
        catalog,
        audit,
        peer_client.clone(),
        config.remote_request_timeout(),
    ));

    let registry = Arc::new(OrderRegistry::new());
    let store = Arc::new(InMemoryOrderStore::new());
    let notifier = Arc::new(RemoteEventNotifier::new(peer_client.clone()));
    let transitioner = Arc::new(StateTransitioner::new(
        registry.clone(),
        store,
        notifier,
        member_id.clone(),
    ));

    let recovered = transitioner
        .recover()
        .map_err(|err| anyhow::anyhow!("recovery failed: {err}"))?;
    if recovered > 0 {
        info!(recovered, "orders recovered into the registry");
    }

    let controller = Arc::new(OrderController::new(
        registry.clone(),
        transitioner.clone(),
        factory.clone(),
        member_id.clone(),
        config.default_cloud.clone(),
    ));
    let auth = Arc::new(AllowAllPlugin);
    let facade = Arc::new(LocalFacade::new(
        controller.clone(),
        auth.clone(),
        peer_client,
    ));
    let remote_facade = Arc::new(RemoteFacade::new(controller, transitioner.clone(), auth));

    let settings = EngineSettings {
        open_poll: config.open_poll(),
        spawning_poll: config.spawning_poll(),
        fulfilled_poll: config.fulfilled_poll(),
        stopping_poll: config.stopping_poll(),
        closed_poll: config.closed_poll(),
        failure_limit: config.failed_request_limit,
    };
    let engine = Engine::new(
        registry.clone(),
        transitioner.clone(),
        factory,
        member_id.clone(),
        settings,
    );

    Ok(Member {
        member_id,
        registry,
        transitioner,
        facade,
        remote_facade,
        engine,
    })
}
