//! fcb-core
//!
//! The order lifecycle engine. Everything in this crate is built around one
//! concurrency rule: an order's record is only ever read-checked-written
//! under that order's own async mutex, and state/queue membership changes go
//! through the [`transition::StateTransitioner`] alone. The registry's
//! per-state queues are synchronized independently so different orders never
//! contend with each other.
//!
//! Construction is explicit: the daemon (or the testkit) builds the
//! registry, transitioner, connector factory, controller, facade and engine
//! once at startup and injects them where needed. There are no globals.

pub mod auth;
pub mod connector;
pub mod controller;
pub mod engine;
pub mod facade;
pub mod order;
pub mod processors;
pub mod registry;
pub mod store;
pub mod transition;

pub use auth::{AllowAllExceptPlugin, AllowAllPlugin, AuthorizationPlugin};
pub use connector::{CloudConnector, ConnectorFactory, PeerClient, UnreachablePeerClient};
pub use controller::OrderController;
pub use engine::{Engine, EngineHandle, EngineSettings};
pub use facade::LocalFacade;
pub use order::Order;
pub use registry::{OrderRegistry, StateQueue};
pub use store::{InMemoryOrderStore, OrderStore};
pub use transition::{EventNotifier, NoopEventNotifier, StateTransitioner};
