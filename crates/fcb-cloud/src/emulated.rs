//! Deterministic in-memory cloud backend.
//!
//! No randomness, no network IO: instance ids come from a running counter
//! and every state change is an explicit call. New instances start in the
//! backend state `"building"` and stay there until a test (or the
//! auto-settle switch) moves them, which is what lets scenario tests drive
//! the spawning/stopping/fulfilled monitors through every branch. Failure
//! scripting mirrors how a flaky or unreachable backend would look to the
//! engine.

use crate::plugin::{CloudPlugin, Result};
use fcb_schemas::{
    AttachmentInstance, BrokerError, ComputeAllocation, ComputeInstance, GenericResponse, Image,
    InstanceState, NetworkInstance, OrderInstance, PublicIpInstance, ResourceQuota,
    ResourceRequest, ResourceType, SecurityRule, SystemUser, VolumeInstance,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

/// Backend states the emulated cloud reports.
pub const BUILDING: &str = "building";
pub const ACTIVE: &str = "active";
pub const ERROR: &str = "error";
pub const STOPPED: &str = "stopped";

struct StoredResource {
    request: ResourceRequest,
    backend_state: String,
    owner_user_id: String,
}

#[derive(Default)]
struct Scripted {
    /// Errors returned by the next `request_instance` calls, in order.
    request: VecDeque<BrokerError>,
    /// Errors returned by the next `get_instance` calls, in order.
    get: VecDeque<BrokerError>,
    /// Errors returned by the next `delete_instance` calls, in order.
    delete: VecDeque<BrokerError>,
}

struct EmulatedState {
    next_instance: u64,
    next_rule: u64,
    resources: HashMap<String, StoredResource>,
    rules: HashMap<String, Vec<SecurityRule>>,
    images: BTreeMap<String, Image>,
    scripted: Scripted,
    /// When set, every call fails with `Unavailable` (peer dark).
    unreachable: bool,
    /// When set, new instances materialize directly in `active`.
    auto_settle: bool,
    delete_calls: u64,
}

pub struct EmulatedCloud {
    cloud_name: String,
    state: Mutex<EmulatedState>,
}

impl EmulatedCloud {
    pub fn new(cloud_name: impl Into<String>) -> Self {
        let mut images = BTreeMap::new();
        for (id, name, size) in [
            ("image-0001", "ubuntu-24.04", 2_361_393_152_u64),
            ("image-0002", "debian-13", 1_884_291_072_u64),
        ] {
            images.insert(
                id.to_string(),
                Image {
                    id: id.to_string(),
                    name: name.to_string(),
                    size_bytes: size,
                    min_disk_gb: 5,
                    min_ram_mb: 512,
                    status: "active".to_string(),
                },
            );
        }
        Self {
            cloud_name: cloud_name.into(),
            state: Mutex::new(EmulatedState {
                next_instance: 1,
                next_rule: 1,
                resources: HashMap::new(),
                rules: HashMap::new(),
                images,
                scripted: Scripted::default(),
                unreachable: false,
                auto_settle: false,
                delete_calls: 0,
            }),
        }
    }

    /// New instances go straight to `active` instead of `building`.
    pub fn with_auto_settle(self) -> Self {
        self.state.lock().unwrap().auto_settle = true;
        self
    }

    // -- test scripting ----------------------------------------------------

    pub fn settle(&self, instance_id: &str) {
        self.set_backend_state(instance_id, ACTIVE);
    }

    pub fn break_instance(&self, instance_id: &str) {
        self.set_backend_state(instance_id, ERROR);
    }

    pub fn stop_instance(&self, instance_id: &str) {
        self.set_backend_state(instance_id, STOPPED);
    }

    fn set_backend_state(&self, instance_id: &str, backend_state: &str) {
        let mut st = self.state.lock().unwrap();
        if let Some(res) = st.resources.get_mut(instance_id) {
            res.backend_state = backend_state.to_string();
        }
    }

    pub fn fail_next_request(&self, error: BrokerError) {
        self.state.lock().unwrap().scripted.request.push_back(error);
    }

    /// Queue `count` consecutive `get_instance` failures.
    pub fn fail_next_gets(&self, count: usize, error: BrokerError) {
        let mut st = self.state.lock().unwrap();
        for _ in 0..count {
            st.scripted.get.push_back(error.clone());
        }
    }

    pub fn fail_next_delete(&self, error: BrokerError) {
        self.state.lock().unwrap().scripted.delete.push_back(error);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    // -- test observation --------------------------------------------------

    pub fn has_instance(&self, instance_id: &str) -> bool {
        self.state.lock().unwrap().resources.contains_key(instance_id)
    }

    pub fn instance_count(&self) -> usize {
        self.state.lock().unwrap().resources.len()
    }

    pub fn delete_call_count(&self) -> u64 {
        self.state.lock().unwrap().delete_calls
    }

    fn check_reachable(st: &EmulatedState) -> Result<()> {
        if st.unreachable {
            return Err(BrokerError::Unavailable(
                "emulated cloud is unreachable".to_string(),
            ));
        }
        Ok(())
    }

    fn build_instance(id: &str, stored: &StoredResource) -> OrderInstance {
        let backend_state = stored.backend_state.clone();
        // The broker-level classification is filled in by the local cloud
        // connector; plugins report Unknown.
        let state = InstanceState::Unknown;
        match &stored.request {
            ResourceRequest::Compute(req) => OrderInstance::Compute(ComputeInstance {
                id: id.to_string(),
                state,
                backend_state,
                name: req.name.clone().unwrap_or_else(|| format!("fcb-{id}")),
                vcpu: req.vcpu,
                ram_mb: req.memory_mb,
                disk_gb: req.disk_gb,
                ip_addresses: vec![format!("10.30.0.{}", 1 + (id.len() as u8 % 250))],
                image_id: req.image_id.clone(),
            }),
            ResourceRequest::Network(req) => OrderInstance::Network(NetworkInstance {
                id: id.to_string(),
                state,
                backend_state,
                name: req.name.clone().unwrap_or_else(|| format!("fcb-{id}")),
                cidr: req.cidr.clone(),
                gateway: req.gateway.clone(),
            }),
            ResourceRequest::Volume(req) => OrderInstance::Volume(VolumeInstance {
                id: id.to_string(),
                state,
                backend_state,
                name: req.name.clone().unwrap_or_else(|| format!("fcb-{id}")),
                size_gb: req.size_gb,
            }),
            ResourceRequest::Attachment(req) => OrderInstance::Attachment(AttachmentInstance {
                id: id.to_string(),
                state,
                backend_state,
                compute_instance_id: req.compute_order_id.to_string(),
                volume_instance_id: req.volume_order_id.to_string(),
                device: req.device.clone(),
            }),
            ResourceRequest::PublicIp(req) => OrderInstance::PublicIp(PublicIpInstance {
                id: id.to_string(),
                state,
                backend_state,
                ip: "198.51.100.17".to_string(),
                compute_instance_id: req.compute_order_id.to_string(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl CloudPlugin for EmulatedCloud {
    fn cloud_name(&self) -> &str {
        &self.cloud_name
    }

    async fn request_instance(
        &self,
        resource: &ResourceRequest,
        user: &SystemUser,
    ) -> Result<String> {
        let mut st = self.state.lock().unwrap();
        Self::check_reachable(&st)?;
        if let Some(err) = st.scripted.request.pop_front() {
            return Err(err);
        }

        let id = format!("i-{:06}", st.next_instance);
        st.next_instance += 1;
        let backend_state = if st.auto_settle { ACTIVE } else { BUILDING };
        st.resources.insert(
            id.clone(),
            StoredResource {
                request: resource.clone(),
                backend_state: backend_state.to_string(),
                owner_user_id: user.id.clone(),
            },
        );
        Ok(id)
    }

    async fn get_instance(
        &self,
        instance_id: &str,
        _resource_type: ResourceType,
        _user: &SystemUser,
    ) -> Result<OrderInstance> {
        let mut st = self.state.lock().unwrap();
        Self::check_reachable(&st)?;
        if let Some(err) = st.scripted.get.pop_front() {
            return Err(err);
        }
        let stored = st
            .resources
            .get(instance_id)
            .ok_or_else(|| BrokerError::NotFound(format!("instance {instance_id} not found")))?;
        Ok(Self::build_instance(instance_id, stored))
    }

    async fn delete_instance(
        &self,
        instance_id: &str,
        _resource_type: ResourceType,
        _user: &SystemUser,
    ) -> Result<()> {
        let mut st = self.state.lock().unwrap();
        Self::check_reachable(&st)?;
        st.delete_calls += 1;
        if let Some(err) = st.scripted.delete.pop_front() {
            return Err(err);
        }
        st.resources
            .remove(instance_id)
            .ok_or_else(|| BrokerError::NotFound(format!("instance {instance_id} not found")))?;
        st.rules.remove(instance_id);
        Ok(())
    }

    fn is_ready(&self, backend_state: &str) -> bool {
        backend_state == ACTIVE
    }

    fn has_failed(&self, backend_state: &str) -> bool {
        backend_state == ERROR
    }

    fn is_stopped(&self, backend_state: &str) -> bool {
        backend_state == STOPPED
    }

    async fn user_quota(&self, user: &SystemUser) -> Result<ResourceQuota> {
        let st = self.state.lock().unwrap();
        Self::check_reachable(&st)?;
        let mut used = ComputeAllocation::default();
        for stored in st.resources.values() {
            if stored.owner_user_id != user.id {
                continue;
            }
            if let ResourceRequest::Compute(req) = &stored.request {
                used.instances += 1;
                used.vcpu += req.vcpu;
                used.ram_mb += req.memory_mb;
                used.disk_gb += req.disk_gb;
            }
        }
        let total = ComputeAllocation {
            instances: 64,
            vcpu: 256,
            ram_mb: 512 * 1024,
            disk_gb: 8 * 1024,
        };
        Ok(ResourceQuota::new(total, used))
    }

    async fn image(&self, image_id: &str, _user: &SystemUser) -> Result<Image> {
        let st = self.state.lock().unwrap();
        Self::check_reachable(&st)?;
        st.images
            .get(image_id)
            .cloned()
            .ok_or_else(|| BrokerError::NotFound(format!("image {image_id} not found")))
    }

    async fn all_images(&self, _user: &SystemUser) -> Result<HashMap<String, String>> {
        let st = self.state.lock().unwrap();
        Self::check_reachable(&st)?;
        Ok(st
            .images
            .values()
            .map(|img| (img.id.clone(), img.name.clone()))
            .collect())
    }

    async fn create_security_rule(
        &self,
        instance_id: &str,
        mut rule: SecurityRule,
        _user: &SystemUser,
    ) -> Result<String> {
        let mut st = self.state.lock().unwrap();
        Self::check_reachable(&st)?;
        if !st.resources.contains_key(instance_id) {
            return Err(BrokerError::NotFound(format!(
                "instance {instance_id} not found"
            )));
        }
        let rule_id = format!("sr-{:06}", st.next_rule);
        st.next_rule += 1;
        rule.id = rule_id.clone();
        st.rules.entry(instance_id.to_string()).or_default().push(rule);
        Ok(rule_id)
    }

    async fn security_rules(
        &self,
        instance_id: &str,
        _user: &SystemUser,
    ) -> Result<Vec<SecurityRule>> {
        let st = self.state.lock().unwrap();
        Self::check_reachable(&st)?;
        Ok(st.rules.get(instance_id).cloned().unwrap_or_default())
    }

    async fn delete_security_rule(&self, rule_id: &str, _user: &SystemUser) -> Result<()> {
        let mut st = self.state.lock().unwrap();
        Self::check_reachable(&st)?;
        for rules in st.rules.values_mut() {
            if let Some(pos) = rules.iter().position(|r| r.id == rule_id) {
                rules.remove(pos);
                return Ok(());
            }
        }
        Err(BrokerError::NotFound(format!(
            "security rule {rule_id} not found"
        )))
    }

    async fn generic_request(&self, body: &str, _user: &SystemUser) -> Result<GenericResponse> {
        let st = self.state.lock().unwrap();
        Self::check_reachable(&st)?;
        let mut response = GenericResponse::new();
        response.insert("cloud".to_string(), self.cloud_name.clone());
        response.insert("echo".to_string(), body.to_string());
        Ok(response)
    }
}
