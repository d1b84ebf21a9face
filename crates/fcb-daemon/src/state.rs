//! Shared runtime state for fcb-daemon.
//!
//! Everything here is `Clone`-able via `Arc`; handlers receive
//! `State<Arc<AppState>>` from Axum. This module owns nothing async itself.

use fcb_core::{LocalFacade, OrderRegistry};
use fcb_federation::RemoteFacade;
use fcb_schemas::MemberId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// BusMsg — SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE
/// events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Status(StatusSnapshot),
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health / status responses.
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// StatusSnapshot
// ---------------------------------------------------------------------------

/// Point-in-time view of this member, returned by GET /v1/status and
/// carried inside SSE `status` events.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub member_id: MemberId,
    pub uptime_secs: u64,
    pub active_orders: usize,
    /// Queue length per lifecycle state.
    pub state_counts: BTreeMap<String, usize>,
    /// SHA-256 of the effective configuration this process booted with.
    pub config_hash: String,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers.
pub struct AppState {
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub member_id: MemberId,
    pub facade: Arc<LocalFacade>,
    pub remote_facade: Arc<RemoteFacade>,
    pub registry: Arc<OrderRegistry>,
    pub config_hash: String,
}

impl AppState {
    pub fn new(
        member_id: MemberId,
        facade: Arc<LocalFacade>,
        remote_facade: Arc<RemoteFacade>,
        registry: Arc<OrderRegistry>,
        config_hash: String,
    ) -> Arc<Self> {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Arc::new(Self {
            bus,
            build: BuildInfo {
                service: "fcb-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            member_id,
            facade,
            remote_facade,
            registry,
            config_hash,
        })
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            member_id: self.member_id.clone(),
            uptime_secs: uptime_secs(),
            active_orders: self.registry.active_count(),
            state_counts: self.registry.state_counts(),
            config_hash: self.config_hash.clone(),
        }
    }
}

/// Periodic heartbeat onto the bus; subscribers see it as an SSE event.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let msg = BusMsg::Heartbeat {
                ts_millis: chrono::Utc::now().timestamp_millis(),
            };
            // No receivers is fine; the bus drops the message.
            let _ = bus.send(msg);
        }
    });
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START.get_or_init(std::time::Instant::now).elapsed().as_secs()
}
