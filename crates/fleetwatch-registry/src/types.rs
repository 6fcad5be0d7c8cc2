//! Domain types for the liveness registry.

use serde::{Deserialize, Serialize};

/// Identifier of a managed workload (a container id in practice).
pub type WorkloadId = String;

/// Liveness state for a single workload.
///
/// A record exists for a workload exactly when at least one heartbeat has
/// been received for it since the last history clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessRecord {
    /// Unix timestamp (seconds) of the most recent heartbeat — or of the
    /// most recent restart attempt, which reuses this field as the
    /// cooldown anchor.
    pub last_seen_at: u64,
    /// True once a restart has been issued and no heartbeat has confirmed
    /// the workload healthy again.
    pub restart_requested: bool,
    /// Boot timestamp reported by the workload itself, if any.
    /// Informational; overwritten only when a newer heartbeat carries one.
    pub boot_time: Option<u64>,
}

impl LivenessRecord {
    /// Fresh record for a first heartbeat.
    pub fn new(now: u64, boot_time: Option<u64>) -> Self {
        Self {
            last_seen_at: now,
            restart_requested: false,
            boot_time,
        }
    }
}

/// Global escalation suppression gate, toggled during planned updates.
///
/// While active and within the suppression window, the escalation engine
/// takes no action for any workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionGate {
    pub active: bool,
    /// Unix timestamp (seconds) of activation; 0 while inactive.
    pub activated_at: u64,
}

impl Default for SuppressionGate {
    fn default() -> Self {
        Self {
            active: false,
            activated_at: 0,
        }
    }
}
