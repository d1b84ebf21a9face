//! fcb-config
//!
//! Broker configuration: layered YAML documents merged in order (earlier
//! docs are base, later docs override), `FCB_*` environment overrides on
//! top, a deterministic SHA-256 hash of the effective configuration, and an
//! unknown-key report so typos do not silently become no-ops.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;

// ---------------------------------------------------------------------------
// BrokerConfig
// ---------------------------------------------------------------------------

/// The configuration surface the engine recognizes. Every field has a
/// default so a single-member development broker starts from an empty file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Identifier of this federation member.
    pub local_member_id: String,
    /// Cloud used when an order names none.
    pub default_cloud: String,
    /// Clouds registered at startup (emulated backend per name).
    pub clouds: Vec<String>,
    /// Peer table: member id -> base URL of its daemon.
    pub peers: BTreeMap<String, String>,

    /// Per-processor poll intervals, in milliseconds (sleep between empty
    /// passes; a non-empty queue drains at full speed).
    pub open_poll_ms: u64,
    pub spawning_poll_ms: u64,
    pub fulfilled_poll_ms: u64,
    pub stopping_poll_ms: u64,
    pub closed_poll_ms: u64,

    /// Consecutive status-check failures before a spawning order is given
    /// up on.
    pub failed_request_limit: u32,
    /// Upper bound on one member-to-member round trip.
    pub remote_request_timeout_ms: u64,

    /// Daemon bind address.
    pub listen_addr: String,

    /// Audit trail destination; `None` disables file auditing.
    pub audit_log_path: Option<String>,
    pub audit_hash_chain: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            local_member_id: "member-local".to_string(),
            default_cloud: "default".to_string(),
            clouds: vec!["default".to_string()],
            peers: BTreeMap::new(),
            open_poll_ms: 1_000,
            spawning_poll_ms: 1_000,
            fulfilled_poll_ms: 5_000,
            stopping_poll_ms: 1_000,
            closed_poll_ms: 1_000,
            failed_request_limit: 5,
            remote_request_timeout_ms: 5_000,
            listen_addr: "127.0.0.1:8800".to_string(),
            audit_log_path: None,
            audit_hash_chain: true,
        }
    }
}

impl BrokerConfig {
    pub fn open_poll(&self) -> Duration {
        Duration::from_millis(self.open_poll_ms)
    }
    pub fn spawning_poll(&self) -> Duration {
        Duration::from_millis(self.spawning_poll_ms)
    }
    pub fn fulfilled_poll(&self) -> Duration {
        Duration::from_millis(self.fulfilled_poll_ms)
    }
    pub fn stopping_poll(&self) -> Duration {
        Duration::from_millis(self.stopping_poll_ms)
    }
    pub fn closed_poll(&self) -> Duration {
        Duration::from_millis(self.closed_poll_ms)
    }
    pub fn remote_request_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_request_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// The effective configuration plus its provenance.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: BrokerConfig,
    /// SHA-256 over the canonical JSON of the effective configuration.
    pub config_hash: String,
    /// Leaf pointers present in the documents but unknown to the engine.
    pub unknown_keys: Vec<String>,
}

/// Load and merge YAML documents from disk, in order.
pub fn load_yaml_files(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs = Vec::new();
    for p in paths {
        let raw = fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }
    let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_yaml_strings(&refs)
}

/// Merge YAML documents already in memory, apply env overrides, and
/// materialize the typed config.
pub fn load_yaml_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        if raw.trim().is_empty() {
            continue;
        }
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    apply_env_overrides(&mut merged, std::env::vars());

    let unknown_keys = unknown_leaf_pointers(&merged);
    for key in &unknown_keys {
        tracing::warn!(pointer = %key, "unknown configuration key ignored");
    }

    let config: BrokerConfig =
        serde_json::from_value(merged.clone()).context("configuration does not match schema")?;

    let canonical = canonical_json(&merged)?;
    let config_hash = sha256_hex(canonical.as_bytes());

    Ok(LoadedConfig {
        config,
        config_hash,
        unknown_keys,
    })
}

/// Environment overrides: `FCB_LOCAL_MEMBER_ID`, `FCB_DEFAULT_CLOUD`,
/// `FCB_LISTEN_ADDR`. Injected before the typed deserialize so they also
/// participate in the config hash.
fn apply_env_overrides(merged: &mut Value, vars: impl Iterator<Item = (String, String)>) {
    const OVERRIDES: &[(&str, &str)] = &[
        ("FCB_LOCAL_MEMBER_ID", "local_member_id"),
        ("FCB_DEFAULT_CLOUD", "default_cloud"),
        ("FCB_LISTEN_ADDR", "listen_addr"),
    ];
    let vars: BTreeMap<String, String> = vars.collect();
    if let Value::Object(map) = merged {
        for (env_key, field) in OVERRIDES {
            if let Some(value) = vars.get(*env_key) {
                map.insert((*field).to_string(), Value::String(value.clone()));
            }
        }
    }
}

/// Leaf pointers the engine actually reads. Anything outside these prefixes
/// is reported as unknown.
const KNOWN_PREFIXES: &[&str] = &[
    "/local_member_id",
    "/default_cloud",
    "/clouds",
    "/peers",
    "/open_poll_ms",
    "/spawning_poll_ms",
    "/fulfilled_poll_ms",
    "/stopping_poll_ms",
    "/closed_poll_ms",
    "/failed_request_limit",
    "/remote_request_timeout_ms",
    "/listen_addr",
    "/audit_log_path",
    "/audit_hash_chain",
];

fn unknown_leaf_pointers(v: &Value) -> Vec<String> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    let mut unknown: Vec<String> = leaves
        .into_iter()
        .filter(|leaf| !KNOWN_PREFIXES.iter().any(|p| is_prefix_pointer(p, leaf)))
        .collect();
    unknown.sort();
    unknown.dedup();
    unknown
}

/// Return true if `prefix` is a JSON-pointer prefix of `leaf`:
/// "/a/b" covers "/a/b" and "/a/b/c" but not "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if leaf == prefix {
        return true;
    }
    if leaf.starts_with(prefix) {
        return leaf
            .get(prefix.len()..prefix.len() + 1)
            .map(|c| c == "/")
            .unwrap_or(false);
    }
    false
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{prefix}/{i}");
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            if !prefix.is_empty() {
                out.push(prefix.to_string());
            }
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn canonical_json(v: &Value) -> Result<String> {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).context("canonical json serialize failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
