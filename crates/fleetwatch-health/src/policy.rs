//! Escalation policy — pure decision logic.
//!
//! [`evaluate`] maps a stale workload's state plus the external context
//! (inventory entry, last update release, suppression gate) to a single
//! [`Decision`]. No I/O, no clock access: callers supply `now`, which keeps
//! every branch directly testable.

use fleetwatch_actions::InventoryEntry;
use fleetwatch_registry::{LivenessRecord, SuppressionGate};

/// Seconds between sweep ticks.
pub const SWEEP_INTERVAL_SECS: u64 = 30;

/// A workload is stale once its last heartbeat is at least this old.
pub const STALE_THRESHOLD_SECS: u64 = 120;

/// How long an active suppression gate pauses all escalation.
pub const SUPPRESSION_WINDOW_SECS: u64 = 3600;

/// Escalation requires the last software update to be older than this.
pub const UPDATE_QUIET_PERIOD_SECS: u64 = 3600;

/// Minimum interval between restart attempts for the same workload.
pub const RESTART_COOLDOWN_SECS: u64 = 6000;

/// Inventory restart counter at which failures are considered persistent.
pub const ESCALATION_RESTART_COUNT: u32 = 5;

/// Outcome of evaluating one stale workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Leave the workload alone this sweep.
    NoAction,
    /// Restart the workload.
    Restart,
    /// Persistent failure: trigger the fleet-wide factory reset.
    FactoryReset,
}

/// Whether a record has gone without a heartbeat long enough to evaluate.
pub fn is_stale(record: &LivenessRecord, now: u64) -> bool {
    now.saturating_sub(record.last_seen_at) >= STALE_THRESHOLD_SECS
}

/// Decide what to do about a stale workload.
///
/// `inventory` is the workload's entry in the external inventory document
/// (`None` when the workload is unknown or the document is degraded);
/// `last_update_release_at` is 0 when the update metadata is degraded.
///
/// Decision order: suppression first, then the unknown-workload restart,
/// then escalation, then the cooldown-limited restart. The unknown-workload
/// branch deliberately bypasses the cooldown; only the in-inventory branch
/// tracks it.
pub fn evaluate(
    record: &LivenessRecord,
    now: u64,
    inventory: Option<&InventoryEntry>,
    last_update_release_at: u64,
    gate: &SuppressionGate,
) -> Decision {
    // Planned update window overrides everything, restarts in flight included.
    if gate.active && now.saturating_sub(gate.activated_at) < SUPPRESSION_WINDOW_SECS {
        return Decision::NoAction;
    }

    let entry = match inventory {
        Some(entry) => entry,
        // Unknown to the inventory: assumed freshly provisioned, always
        // worth a restart.
        None => return Decision::Restart,
    };

    if now.saturating_sub(last_update_release_at) > UPDATE_QUIET_PERIOD_SECS
        && entry.restart_count >= ESCALATION_RESTART_COUNT
    {
        return Decision::FactoryReset;
    }

    if !record.restart_requested
        || now.saturating_sub(record.last_seen_at) >= RESTART_COOLDOWN_SECS
    {
        Decision::Restart
    } else {
        Decision::NoAction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(last_seen_at: u64, restart_requested: bool) -> LivenessRecord {
        LivenessRecord {
            last_seen_at,
            restart_requested,
            boot_time: None,
        }
    }

    fn entry(restart_count: u32) -> InventoryEntry {
        InventoryEntry { restart_count }
    }

    fn inactive_gate() -> SuppressionGate {
        SuppressionGate::default()
    }

    fn active_gate(activated_at: u64) -> SuppressionGate {
        SuppressionGate {
            active: true,
            activated_at,
        }
    }

    #[test]
    fn staleness_boundary() {
        assert!(!is_stale(&record(1000, false), 1119));
        assert!(is_stale(&record(1000, false), 1120));
        // Clock skew: last_seen_at in the future is not stale.
        assert!(!is_stale(&record(2000, false), 1000));
    }

    #[test]
    fn suppression_overrides_everything() {
        let rec = record(1000, false);
        let gate = active_gate(100_000);
        // Even the unknown-workload and escalation branches stay quiet.
        for (inventory, update) in [
            (None, 0),
            (Some(entry(9)), 0),
            (Some(entry(0)), 90_000),
        ] {
            assert_eq!(
                evaluate(&rec, 100_500, inventory.as_ref(), update, &gate),
                Decision::NoAction
            );
        }
    }

    #[test]
    fn expired_suppression_no_longer_gates() {
        let rec = record(1000, false);
        let gate = active_gate(100_000);
        // Exactly one window later the gate has lapsed.
        assert_eq!(
            evaluate(&rec, 100_000 + SUPPRESSION_WINDOW_SECS, None, 0, &gate),
            Decision::Restart
        );
    }

    #[test]
    fn unknown_workload_always_restarts() {
        // Regardless of cooldown state or update recency.
        let flagged = record(99_000, true);
        assert_eq!(
            evaluate(&flagged, 100_000, None, 99_900, &inactive_gate()),
            Decision::Restart
        );
        let fresh = record(1000, false);
        assert_eq!(
            evaluate(&fresh, 1130, None, 0, &inactive_gate()),
            Decision::Restart
        );
    }

    #[test]
    fn persistent_failure_after_quiet_period_escalates() {
        let rec = record(1000, false);
        let now = 10_000;
        assert_eq!(
            evaluate(&rec, now, Some(&entry(5)), 1000, &inactive_gate()),
            Decision::FactoryReset
        );
        // One fewer restart: back to a plain restart.
        assert_eq!(
            evaluate(&rec, now, Some(&entry(4)), 1000, &inactive_gate()),
            Decision::Restart
        );
    }

    #[test]
    fn recent_update_blocks_escalation() {
        let rec = record(1000, false);
        let now = 10_000;
        // Update exactly one quiet period ago: not strictly older, restart.
        assert_eq!(
            evaluate(
                &rec,
                now,
                Some(&entry(8)),
                now - UPDATE_QUIET_PERIOD_SECS,
                &inactive_gate()
            ),
            Decision::Restart
        );
    }

    #[test]
    fn degraded_update_metadata_still_escalates_high_counts() {
        // A release date of 0 reads as "long before now", so escalation
        // hinges on the restart counter alone.
        let rec = record(1000, false);
        assert_eq!(
            evaluate(&rec, 10_000, Some(&entry(5)), 0, &inactive_gate()),
            Decision::FactoryReset
        );
    }

    #[test]
    fn cooldown_blocks_repeat_restarts() {
        let t0 = 50_000;
        let rec = record(t0, true); // restart issued at t0

        assert_eq!(
            evaluate(&rec, t0 + 5000, Some(&entry(1)), t0, &inactive_gate()),
            Decision::NoAction
        );
        assert_eq!(
            evaluate(&rec, t0 + RESTART_COOLDOWN_SECS, Some(&entry(1)), t0, &inactive_gate()),
            Decision::Restart
        );
    }

    #[test]
    fn unflagged_workload_restarts_without_cooldown() {
        let rec = record(1000, false);
        assert_eq!(
            evaluate(&rec, 1200, Some(&entry(2)), 1000, &inactive_gate()),
            Decision::Restart
        );
    }
}
