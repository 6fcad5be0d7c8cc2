//! Registry — synchronized operations over liveness records and the gate.
//!
//! Every mutation in the watchdog funnels through these methods. No
//! operation performs I/O or holds a lock beyond the in-memory update, so
//! callers (the sweep loop, per-message handlers) never block each other
//! for longer than a map access. Slow external work happens on a
//! `snapshot()` copy, outside any lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::types::{LivenessRecord, SuppressionGate, WorkloadId};

/// Thread-safe registry of workload liveness state.
#[derive(Clone, Default)]
pub struct Registry {
    records: Arc<RwLock<HashMap<WorkloadId, LivenessRecord>>>,
    gate: Arc<RwLock<SuppressionGate>>,
}

impl Registry {
    /// Create an empty registry with an inactive suppression gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a heartbeat for a workload.
    ///
    /// Creates the record on first contact. Always refreshes
    /// `last_seen_at` and clears `restart_requested` (a heartbeat is the
    /// recovery signal). The boot time is overwritten only when the
    /// heartbeat carries one.
    pub async fn record_heartbeat(&self, id: &str, now: u64, boot_time: Option<u64>) {
        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(record) => {
                record.last_seen_at = now;
                record.restart_requested = false;
                if boot_time.is_some() {
                    record.boot_time = boot_time;
                }
            }
            None => {
                debug!(workload = %id, "first heartbeat, creating record");
                records.insert(id.to_string(), LivenessRecord::new(now, boot_time));
            }
        }
    }

    /// Record that a restart was issued for a workload.
    ///
    /// Sets `restart_requested` and moves `last_seen_at` to the attempt
    /// time, which anchors the restart cooldown. Creates the record if a
    /// concurrent history clear removed it mid-sweep.
    pub async fn mark_restart_issued(&self, id: &str, now: u64) {
        let mut records = self.records.write().await;
        let record = records
            .entry(id.to_string())
            .or_insert_with(|| LivenessRecord::new(now, None));
        record.last_seen_at = now;
        record.restart_requested = true;
    }

    /// Current record for a workload, if one exists.
    pub async fn get(&self, id: &str) -> Option<LivenessRecord> {
        self.records.read().await.get(id).cloned()
    }

    /// Point-in-time copy of all records.
    ///
    /// The sweep loop iterates this copy so that external calls never run
    /// under the registry lock.
    pub async fn snapshot(&self) -> HashMap<WorkloadId, LivenessRecord> {
        self.records.read().await.clone()
    }

    /// Drop all liveness history.
    ///
    /// A heartbeat racing the clear may be lost or may recreate a fresh
    /// record; both outcomes are accepted.
    pub async fn clear_all(&self) {
        let mut records = self.records.write().await;
        let dropped = records.len();
        records.clear();
        debug!(dropped, "liveness history cleared");
    }

    /// Number of tracked workloads.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether no workload is currently tracked.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Current suppression gate state.
    pub async fn suppression(&self) -> SuppressionGate {
        *self.gate.read().await
    }

    /// Toggle the suppression gate.
    ///
    /// Activation stamps `activated_at = now`; deactivation resets it to
    /// the 0 sentinel.
    pub async fn set_suppression(&self, active: bool, now: u64) {
        let mut gate = self.gate.write().await;
        gate.active = active;
        gate.activated_at = if active { now } else { 0 };
        debug!(active, activated_at = gate.activated_at, "suppression gate set");
    }
}
