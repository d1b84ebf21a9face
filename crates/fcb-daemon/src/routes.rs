//! Axum router and all HTTP handlers for fcb-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and
//! attaches middleware layers afterwards so the route tests can compose
//! the bare router.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use fcb_federation::{serve_request, PeerEnvelope, PeerReply};
use fcb_schemas::ErrorKind;
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::state::{AppState, BusMsg};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the application router wired to the given shared state.
/// Middleware layers (CORS, tracing) are attached by `main.rs`.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/stream", get(stream))
        .route("/v1/peer", post(peer))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
    version: &'static str,
    member_id: String,
}

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
            member_id: st.member_id.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = st.snapshot();
    let _ = st.bus.send(BusMsg::Status(snap.clone()));
    (StatusCode::OK, Json(snap))
}

// ---------------------------------------------------------------------------
// GET /v1/stream — SSE bridge over the broadcast bus
// ---------------------------------------------------------------------------

pub(crate) async fn stream(
    State(st): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = st.bus.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| async move {
        let msg = msg.ok()?;
        let label = match &msg {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::Status(_) => "status",
        };
        let data = serde_json::to_string(&msg).ok()?;
        Some(Ok::<_, Infallible>(Event::default().event(label).data(data)))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ---------------------------------------------------------------------------
// POST /v1/peer — the member-to-member HTTP binding
// ---------------------------------------------------------------------------

/// HTTP status carried alongside each typed wire error.
fn status_of(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::InvalidParameter | ErrorKind::Inconsistent => StatusCode::BAD_REQUEST,
        ErrorKind::NoAvailableResources => StatusCode::CONFLICT,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) async fn peer(
    State(st): State<Arc<AppState>>,
    Json(envelope): Json<PeerEnvelope>,
) -> impl IntoResponse {
    debug!(sender = %envelope.sender, op = envelope.request.label(), "peer request");
    match serve_request(&st.remote_facade, &envelope.sender, envelope.request).await {
        Ok(response) => (StatusCode::OK, Json(PeerReply::success(response))),
        Err(err) => {
            let status = status_of(err.kind());
            (status, Json(PeerReply::failure(&err)))
        }
    }
}
