//! fcb-cloud
//!
//! The boundary between the order engine and concrete cloud backends. This
//! crate owns the plugin contract ([`CloudPlugin`]), the per-member catalog
//! of registered clouds ([`CloudCatalog`]), and the deterministic in-memory
//! backend ([`EmulatedCloud`]) used by tests and single-member development
//! deployments. Real cloud adapters implement [`CloudPlugin`] in their own
//! crates and register through the catalog.

pub mod catalog;
pub mod emulated;
pub mod plugin;

pub use catalog::CloudCatalog;
pub use emulated::EmulatedCloud;
pub use plugin::CloudPlugin;
