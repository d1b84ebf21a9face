use fcb_core::PeerClient;
use fcb_schemas::{BrokerError, ErrorKind, MemberId, PeerRequest, PeerResponse};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// What travels in a POST to a peer's `/v1/peer` route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerEnvelope {
    /// The sending member. A production deployment authenticates this at
    /// the transport layer (mTLS, signed tokens); the wire format itself is
    /// out of scope here.
    pub sender: MemberId,
    pub request: PeerRequest,
}

/// Typed error as it crosses the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Reply to a peer request: exactly one of `ok` / `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<PeerResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl PeerReply {
    pub fn success(response: PeerResponse) -> Self {
        Self {
            ok: Some(response),
            error: None,
        }
    }

    pub fn failure(err: &BrokerError) -> Self {
        Self {
            ok: None,
            error: Some(WireError {
                kind: err.kind(),
                message: err.message().to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// HttpPeerClient
// ---------------------------------------------------------------------------

/// HTTP/JSON binding of the peer transport. Routes by a static member →
/// base-URL table; transport-level failures (no route, connect errors,
/// timeouts) surface as `Unavailable`, while typed errors raised at the
/// peer are rebuilt verbatim from the wire reply.
pub struct HttpPeerClient {
    client: reqwest::Client,
    sender: MemberId,
    peers: BTreeMap<String, String>,
}

impl HttpPeerClient {
    pub fn new(
        sender: MemberId,
        peers: BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, BrokerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| BrokerError::Unexpected(format!("http client build failed: {err}")))?;
        Ok(Self {
            client,
            sender,
            peers,
        })
    }
}

#[async_trait::async_trait]
impl PeerClient for HttpPeerClient {
    async fn call(
        &self,
        member: &MemberId,
        request: PeerRequest,
    ) -> Result<PeerResponse, BrokerError> {
        let base = self.peers.get(member.as_str()).ok_or_else(|| {
            BrokerError::Unavailable(format!("no route configured for member {member}"))
        })?;
        let url = format!("{}/v1/peer", base.trim_end_matches('/'));
        let envelope = PeerEnvelope {
            sender: self.sender.clone(),
            request,
        };

        let response = self
            .client
            .post(url)
            .json(&envelope)
            .send()
            .await
            .map_err(|err| {
                BrokerError::Unavailable(format!("member {member} unreachable: {err}"))
            })?;

        let reply: PeerReply = response.json().await.map_err(|err| {
            BrokerError::Unexpected(format!("malformed reply from member {member}: {err}"))
        })?;

        match (reply.ok, reply.error) {
            (Some(ok), None) => Ok(ok),
            (None, Some(err)) => Err(BrokerError::from_kind(err.kind, err.message)),
            _ => Err(BrokerError::Unexpected(format!(
                "reply from member {member} carried neither result nor error"
            ))),
        }
    }
}
