//! fcb-federation
//!
//! The member-to-member side of the broker. [`RemoteFacade`] is the entry
//! surface a providing member exposes to its peers (plus the
//! requester-side event handling path); [`dispatch::serve_request`] maps
//! the transport-neutral [`fcb_schemas::PeerRequest`] contract onto it.
//! [`HttpPeerClient`] is the HTTP/JSON binding of the client side, and
//! [`RemoteEventNotifier`] delivers provider events with bounded retry.

pub mod dispatch;
pub mod facade;
pub mod http;
pub mod notifier;

pub use dispatch::serve_request;
pub use facade::RemoteFacade;
pub use http::{HttpPeerClient, PeerEnvelope, PeerReply, WireError};
pub use notifier::RemoteEventNotifier;
