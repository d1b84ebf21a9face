use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OrderState
// ---------------------------------------------------------------------------

/// Lifecycle state of an order. All resource types share the same machine.
///
/// ```text
///            activate                  ready
///   Open ──────────────► Spawning ──────────────► Fulfilled ───► Closed
///    │                      │                      │   │
///    │ activate (remote)    │ fail                 │   │ stop (compute)
///    ▼                      ▼                      │   ▼
///  Pending ───────────► FailedAfterSuccessfulRequest◄──Stopping ─► Stopped
///    (event-driven)
///
///   Open ── fail (pre-provision) ──► Failed
///   any transient ── connectivity failure ──► UnableToCheckStatus
///   any non-closed ── delete ──► Closed
/// ```
///
/// `Pending` is occupied only by orders whose provider is a remote member;
/// such orders are advanced exclusively by incoming provider events, never
/// by a local processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    Open,
    Pending,
    Spawning,
    Fulfilled,
    Stopping,
    Stopped,
    Closed,
    Failed,
    FailedAfterSuccessfulRequest,
    UnableToCheckStatus,
}

impl OrderState {
    /// Every state, in declaration order. The registry builds one queue per
    /// entry.
    pub const ALL: [OrderState; 10] = [
        OrderState::Open,
        OrderState::Pending,
        OrderState::Spawning,
        OrderState::Fulfilled,
        OrderState::Stopping,
        OrderState::Stopped,
        OrderState::Closed,
        OrderState::Failed,
        OrderState::FailedAfterSuccessfulRequest,
        OrderState::UnableToCheckStatus,
    ];

    /// States in which the backend request has not been issued yet, so a
    /// delete needs no backend interaction.
    pub fn is_pre_provision(&self) -> bool {
        matches!(self, OrderState::Open)
    }

    /// States from which no processor will move the order any further.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            OrderState::Failed | OrderState::FailedAfterSuccessfulRequest
        )
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderState::Open => "OPEN",
            OrderState::Pending => "PENDING",
            OrderState::Spawning => "SPAWNING",
            OrderState::Fulfilled => "FULFILLED",
            OrderState::Stopping => "STOPPING",
            OrderState::Stopped => "STOPPED",
            OrderState::Closed => "CLOSED",
            OrderState::Failed => "FAILED",
            OrderState::FailedAfterSuccessfulRequest => "FAILED_AFTER_SUCCESSFUL_REQUEST",
            OrderState::UnableToCheckStatus => "UNABLE_TO_CHECK_STATUS",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// InstanceState
// ---------------------------------------------------------------------------

/// Last observed status of the backend instance behind an order.
///
/// At the providing member this is derived from the cloud plugin's
/// `is_ready` / `has_failed` classification; at the requesting member it is
/// whatever the provider last pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceState {
    /// Order accepted, no backend request made yet.
    Dispatched,
    /// Backend is still bringing the instance up.
    Creating,
    /// Instance is up and usable.
    Ready,
    /// Instance exists but is transiently busy.
    Busy,
    /// Backend reported the instance as failed.
    Failed,
    /// Compute instance has been stopped.
    Stopped,
    /// Status could not be determined.
    Unknown,
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceState::Dispatched => "DISPATCHED",
            InstanceState::Creating => "CREATING",
            InstanceState::Ready => "READY",
            InstanceState::Busy => "BUSY",
            InstanceState::Failed => "FAILED",
            InstanceState::Stopped => "STOPPED",
            InstanceState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ComputeAllocation
// ---------------------------------------------------------------------------

/// Realized compute capacity. Reported by the providing member once the
/// backend materializes the instance; may differ from what was requested
/// (e.g. flavor rounding).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeAllocation {
    pub instances: u32,
    pub vcpu: u32,
    pub ram_mb: u64,
    pub disk_gb: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_states_are_distinct() {
        for (i, a) in OrderState::ALL.iter().enumerate() {
            for b in &OrderState::ALL[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn failure_classification() {
        assert!(OrderState::Failed.is_failure());
        assert!(OrderState::FailedAfterSuccessfulRequest.is_failure());
        assert!(!OrderState::Closed.is_failure());
        assert!(!OrderState::UnableToCheckStatus.is_failure());
    }

    #[test]
    fn state_serializes_screaming_snake() {
        let s = serde_json::to_string(&OrderState::FailedAfterSuccessfulRequest).unwrap();
        assert_eq!(s, "\"FAILED_AFTER_SUCCESSFUL_REQUEST\"");
    }
}
