use fcb_core::PeerClient;
use fcb_federation::{serve_request, RemoteFacade};
use fcb_schemas::{BrokerError, MemberId, PeerRequest, PeerResponse};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// An in-process federation: member id -> that member's remote facade.
/// Members can be taken down to simulate an unreachable peer.
pub struct InProcessNetwork {
    facades: Mutex<HashMap<String, Arc<RemoteFacade>>>,
    down: Mutex<HashSet<String>>,
}

impl InProcessNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            facades: Mutex::new(HashMap::new()),
            down: Mutex::new(HashSet::new()),
        })
    }

    pub fn register(&self, member: &MemberId, facade: Arc<RemoteFacade>) {
        self.facades
            .lock()
            .unwrap()
            .insert(member.as_str().to_string(), facade);
    }

    /// Make a member unreachable (or reachable again) without
    /// de-registering it.
    pub fn set_down(&self, member: &MemberId, down: bool) {
        let mut set = self.down.lock().unwrap();
        if down {
            set.insert(member.as_str().to_string());
        } else {
            set.remove(member.as_str());
        }
    }

    fn facade_of(&self, member: &MemberId) -> Result<Arc<RemoteFacade>, BrokerError> {
        if self.down.lock().unwrap().contains(member.as_str()) {
            return Err(BrokerError::Unavailable(format!(
                "member {member} is unreachable"
            )));
        }
        self.facades
            .lock()
            .unwrap()
            .get(member.as_str())
            .cloned()
            .ok_or_else(|| BrokerError::Unavailable(format!("no route to member {member}")))
    }
}

/// Peer client bound to one sending member of an [`InProcessNetwork`].
/// Requests dispatch straight into the receiving member's facade through
/// the same `serve_request` glue the HTTP binding uses.
pub struct InProcessPeerClient {
    network: Arc<InProcessNetwork>,
    sender: MemberId,
}

impl InProcessPeerClient {
    pub fn new(network: Arc<InProcessNetwork>, sender: MemberId) -> Self {
        Self { network, sender }
    }
}

#[async_trait::async_trait]
impl PeerClient for InProcessPeerClient {
    async fn call(
        &self,
        member: &MemberId,
        request: PeerRequest,
    ) -> Result<PeerResponse, BrokerError> {
        let facade = self.network.facade_of(member)?;
        serve_request(&facade, &self.sender, request).await
    }
}
