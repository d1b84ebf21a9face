//! fcb-audit
//!
//! Append-only audit trail for cloud connector operations. Writes JSON
//! Lines (one record per line) with an optional hash chain: each record
//! carries `hash_prev` + `hash_self`, so any later tampering with a line
//! breaks verification of everything after it.
//!
//! The engine consumes this through the [`AuditSink`] seam; recording is
//! fire-and-forget (failures are logged, never propagated into the order
//! path). The engine's own polling calls run through an unaudited connector
//! so automated status checks do not flood the trail.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fcb_schemas::{MemberId, OperationKind, OrderId, ResourceType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// AuditRecord
// ---------------------------------------------------------------------------

/// One audited connector operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event_id: Uuid,
    /// The member whose connector performed the operation.
    pub member_id: MemberId,
    pub ts_utc: DateTime<Utc>,
    /// Principal id behind the call.
    pub user_id: String,
    pub operation: OperationKind,
    pub resource: ResourceType,
    pub cloud_name: String,
    pub order_id: Option<OrderId>,
    /// "ok" or the error kind string.
    pub outcome: String,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

/// The operation-shaped part of a record, before the writer stamps ids,
/// timestamps and chain hashes.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: String,
    pub operation: OperationKind,
    pub resource: ResourceType,
    pub cloud_name: String,
    pub order_id: Option<OrderId>,
    pub outcome: String,
}

// ---------------------------------------------------------------------------
// AuditSink
// ---------------------------------------------------------------------------

/// Seam the local cloud connector records through. Implementations must be
/// cheap enough to call inline from the order path.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Sink that drops every entry. For tests not concerned with auditing.
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _entry: AuditEntry) {}
}

/// File-backed sink wrapping an [`AuditWriter`]. Write failures are logged
/// and swallowed: the audit trail must never take an order down with it.
pub struct FileAuditSink {
    writer: Mutex<AuditWriter>,
}

impl FileAuditSink {
    pub fn new(writer: AuditWriter) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, entry: AuditEntry) {
        let mut writer = self.writer.lock().unwrap();
        if let Err(err) = writer.append(entry) {
            tracing::warn!(error = %err, "audit append failed");
        }
    }
}

// ---------------------------------------------------------------------------
// AuditWriter
// ---------------------------------------------------------------------------

/// Append-only writer. One record per line; optional hash chain.
pub struct AuditWriter {
    path: PathBuf,
    member_id: MemberId,
    hash_chain: bool,
    last_hash: Option<String>,
    /// Monotonically increasing counter used for deterministic `event_id`
    /// derivation. When resuming an existing log, restore with `set_seq`
    /// alongside `set_last_hash`.
    seq: u64,
}

impl AuditWriter {
    /// Creates the writer and ensures parent dirs exist.
    pub fn new(path: impl AsRef<Path>, member_id: MemberId, hash_chain: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {parent:?}"))?;
        }
        Ok(Self {
            path,
            member_id,
            hash_chain,
            last_hash: None,
            seq: 0,
        })
    }

    /// Set last hash explicitly (e.g., after reading the last line on
    /// restart).
    pub fn set_last_hash(&mut self, last_hash: Option<String>) {
        self.last_hash = last_hash;
    }

    /// Restore the sequence counter when resuming an existing log. Pass the
    /// number of records already written.
    pub fn set_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Append one record.
    pub fn append(&mut self, entry: AuditEntry) -> Result<AuditRecord> {
        // event_id derived deterministically from chain state + seq; no RNG,
        // so replaying the same operations yields the same ids.
        let event_id = derive_event_id(self.last_hash.as_deref(), self.seq);
        self.seq += 1;

        let mut record = AuditRecord {
            event_id,
            member_id: self.member_id.clone(),
            ts_utc: Utc::now(),
            user_id: entry.user_id,
            operation: entry.operation,
            resource: entry.resource,
            cloud_name: entry.cloud_name,
            order_id: entry.order_id,
            outcome: entry.outcome,
            hash_prev: None,
            hash_self: None,
        };

        if self.hash_chain {
            record.hash_prev = self.last_hash.clone();
            let self_hash = compute_record_hash(&record)?;
            record.hash_self = Some(self_hash.clone());
            self.last_hash = Some(self_hash);
        }

        let line = canonical_json_line(&record)?;
        append_line(&self.path, &line)?;
        Ok(record)
    }
}

fn derive_event_id(last_hash: Option<&str>, seq: u64) -> Uuid {
    let mut hasher = Sha256::new();
    hasher.update(last_hash.unwrap_or("genesis").as_bytes());
    hasher.update(seq.to_be_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

/// Write a single line to the file (with trailing newline).
fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open audit log {path:?}"))?;
    f.write_all(line.as_bytes())
        .context("write audit line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}

/// Canonicalize by sorting keys recursively and emitting compact JSON.
fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize audit record failed")?;
    let sorted = sort_keys(&raw);
    serde_json::to_string(&sorted).context("json stringify failed")
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

/// The chain hash covers the canonical JSON of the record WITHOUT
/// `hash_self` (to avoid self-reference).
pub fn compute_record_hash(record: &AuditRecord) -> Result<String> {
    let mut clone = record.clone();
    clone.hash_self = None;
    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Chain verification
// ---------------------------------------------------------------------------

/// Result of hash chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// The entire chain is valid.
    Valid { lines: usize },
    /// The chain is broken at the given line.
    Broken { line: usize, reason: String },
}

/// Verify the hash chain integrity of an audit log file.
pub fn verify_hash_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read audit log {:?}", path.as_ref()))?;
    verify_hash_chain_str(&content)
}

/// Same logic as [`verify_hash_chain`] but over in-memory JSONL content.
pub fn verify_hash_chain_str(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut line_count = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: AuditRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("parse audit record at line {}", i + 1))?;
        line_count += 1;

        if record.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, record.hash_prev
                ),
            });
        }

        if let Some(ref claimed) = record.hash_self {
            let recomputed = compute_record_hash(&record)?;
            if *claimed != recomputed {
                return Ok(VerifyResult::Broken {
                    line: i + 1,
                    reason: format!("hash_self mismatch: claimed {claimed}, recomputed {recomputed}"),
                });
            }
        }

        prev_hash = record.hash_self.clone();
    }

    Ok(VerifyResult::Valid { lines: line_count })
}
