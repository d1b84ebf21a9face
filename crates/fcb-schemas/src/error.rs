use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error taxonomy shared by every layer of the broker.
///
/// The variants are deliberately coarse: they are the contract between the
/// engine, the facades, and the member-to-member protocol, and each maps to
/// exactly one wire kind (see [`BrokerError::kind`]). Cloud plugins and the
/// transport translate their native failures into this surface so callers
/// never see backend- or transport-specific error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The order or backend instance does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Authenticated but not permitted.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed or rejected request parameters.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Consistency violation: requester/provider mismatch, ownership
    /// mismatch, endpoint/record resource-type mismatch.
    #[error("inconsistent request: {0}")]
    Inconsistent(String),

    /// The backend cannot satisfy the request right now.
    #[error("no available resources: {0}")]
    NoAvailableResources(String),

    /// Peer or backend unreachable. Retryable; the only connectivity-classed
    /// variant.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Programming or invariant violation; never expected to be
    /// user-triggered.
    #[error("unexpected: {0}")]
    Unexpected(String),
}

impl BrokerError {
    /// Connectivity-classified errors escalate a polling order straight to
    /// `UNABLE_TO_CHECK_STATUS`, bypassing the consecutive-failure counter.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, BrokerError::Unavailable(_))
    }

    /// Stable wire identifier of the variant.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BrokerError::NotFound(_) => ErrorKind::NotFound,
            BrokerError::Unauthorized(_) => ErrorKind::Unauthorized,
            BrokerError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            BrokerError::Inconsistent(_) => ErrorKind::Inconsistent,
            BrokerError::NoAvailableResources(_) => ErrorKind::NoAvailableResources,
            BrokerError::Unavailable(_) => ErrorKind::Unavailable,
            BrokerError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            BrokerError::NotFound(m)
            | BrokerError::Unauthorized(m)
            | BrokerError::InvalidParameter(m)
            | BrokerError::Inconsistent(m)
            | BrokerError::NoAvailableResources(m)
            | BrokerError::Unavailable(m)
            | BrokerError::Unexpected(m) => m,
        }
    }

    /// Rebuild a typed error from its wire representation.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::NotFound => BrokerError::NotFound(message),
            ErrorKind::Unauthorized => BrokerError::Unauthorized(message),
            ErrorKind::InvalidParameter => BrokerError::InvalidParameter(message),
            ErrorKind::Inconsistent => BrokerError::Inconsistent(message),
            ErrorKind::NoAvailableResources => BrokerError::NoAvailableResources(message),
            ErrorKind::Unavailable => BrokerError::Unavailable(message),
            ErrorKind::Unexpected => BrokerError::Unexpected(message),
        }
    }
}

/// Wire form of a [`BrokerError`] variant. Serialized in peer error
/// responses so the requesting side can rebuild the same typed error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidParameter,
    Inconsistent,
    NoAvailableResources,
    Unavailable,
    Unexpected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_connectivity() {
        assert!(BrokerError::Unavailable("peer down".into()).is_connectivity());
        assert!(!BrokerError::NotFound("x".into()).is_connectivity());
        assert!(!BrokerError::Unexpected("x".into()).is_connectivity());
    }

    #[test]
    fn wire_round_trip_preserves_variant() {
        let original = BrokerError::Inconsistent("requester mismatch".into());
        let rebuilt = BrokerError::from_kind(original.kind(), original.message());
        assert_eq!(original, rebuilt);
    }
}
