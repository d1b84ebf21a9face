use crate::plugin::CloudPlugin;
use fcb_schemas::BrokerError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The clouds one federation member exposes: cloud name -> plugin, plus the
/// default cloud used when an order names none.
///
/// Built once at startup and shared immutably; registration after
/// construction is not supported.
pub struct CloudCatalog {
    default_cloud: String,
    plugins: BTreeMap<String, Arc<dyn CloudPlugin>>,
}

impl CloudCatalog {
    pub fn new(default_cloud: impl Into<String>) -> Self {
        Self {
            default_cloud: default_cloud.into(),
            plugins: BTreeMap::new(),
        }
    }

    pub fn register(mut self, plugin: Arc<dyn CloudPlugin>) -> Self {
        self.plugins.insert(plugin.cloud_name().to_string(), plugin);
        self
    }

    pub fn default_cloud(&self) -> &str {
        &self.default_cloud
    }

    /// Resolve the plugin for a cloud name; an empty name means the default
    /// cloud.
    pub fn plugin(&self, cloud_name: &str) -> Result<Arc<dyn CloudPlugin>, BrokerError> {
        let name = if cloud_name.is_empty() {
            &self.default_cloud
        } else {
            cloud_name
        };
        self.plugins
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::NotFound(format!("cloud not registered: {name}")))
    }

    /// Names of every registered cloud, sorted.
    pub fn cloud_names(&self) -> Vec<String> {
        self.plugins.keys().cloned().collect()
    }
}
