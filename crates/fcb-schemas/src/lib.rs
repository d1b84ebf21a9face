//! fcb-schemas
//!
//! Shared data model for the federated cloud broker. This crate sits at the
//! root of the dependency graph and holds only plain data: identifiers,
//! lifecycle states, resource requests and instances, quota/image/security
//! rule shapes, the error taxonomy, and the member-to-member message
//! contracts. No IO, no locking, no engine logic.

pub mod error;
pub mod ids;
pub mod instance;
pub mod messages;
pub mod operation;
pub mod order;
pub mod resource;
pub mod rules;
pub mod state;

pub use error::{BrokerError, ErrorKind};
pub use ids::{MemberId, OrderId, SystemUser};
pub use instance::{
    AttachmentInstance, ComputeInstance, GenericResponse, NetworkInstance, OrderInstance,
    PublicIpInstance, VolumeInstance,
};
pub use messages::{OrderEvent, OrderEventKind, PeerRequest, PeerResponse, ProviderSnapshot};
pub use operation::{BrokerOperation, OperationKind};
pub use order::OrderRecord;
pub use resource::{
    AttachmentRequest, ComputeRequest, NetworkAllocationMode, NetworkRequest, PublicIpRequest,
    ResourceRequest, ResourceType, VolumeRequest,
};
pub use rules::{Image, ResourceQuota, SecurityRule, SecurityRuleDirection};
pub use state::{ComputeAllocation, InstanceState, OrderState};
