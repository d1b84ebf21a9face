use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Opaque unique identifier of an order. Generated once at creation and
/// immutable for the order's lifetime; identical at the requesting and the
/// providing member for federated orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Generate a fresh random id.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// MemberId
// ---------------------------------------------------------------------------

/// Identifier of a federation member (one broker deployment).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// SystemUser
// ---------------------------------------------------------------------------

/// The authenticated principal behind a request.
///
/// Authentication happens outside the engine; by the time a facade sees a
/// `SystemUser` it is trusted. Ownership checks compare `id` only; the
/// display name and the identity member are informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemUser {
    /// Stable identifier of the user at its identity member.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// The federation member that authenticated this user.
    pub identity_member: MemberId,
}

impl SystemUser {
    pub fn new(id: impl Into<String>, name: impl Into<String>, identity_member: MemberId) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            identity_member,
        }
    }

    /// Returns `true` when both users denote the same principal.
    pub fn same_principal(&self, other: &SystemUser) -> bool {
        self.id == other.id
    }
}
