//! Health sweep — the periodic staleness scan.
//!
//! Every 30 seconds the sweep snapshots the registry, evaluates each stale
//! workload against the escalation policy, and applies the decisions. The
//! snapshot keeps external calls (docker, the reset script, document reads)
//! outside the registry lock. One workload failing never aborts the rest of
//! the tick, and the fleet-wide factory reset fires at most once per tick.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use fleetwatch_actions::{ExternalDocs, WorkloadActions};
use fleetwatch_registry::Registry;

use crate::policy::{self, Decision, SWEEP_INTERVAL_SECS};

/// The periodic health sweep task.
pub struct HealthSweep {
    registry: Registry,
    actions: Arc<dyn WorkloadActions>,
    docs: ExternalDocs,
}

impl HealthSweep {
    pub fn new(registry: Registry, actions: Arc<dyn WorkloadActions>, docs: ExternalDocs) -> Self {
        Self {
            registry,
            actions,
            docs,
        }
    }

    /// Run the sweep loop until the shutdown signal flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = SWEEP_INTERVAL_SECS, "health sweep started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(SWEEP_INTERVAL_SECS)) => {
                    self.tick(epoch_secs()).await;
                }
                _ = shutdown.changed() => {
                    info!("health sweep shutting down");
                    break;
                }
            }
        }
    }

    /// Evaluate one sweep pass at the given time.
    pub async fn tick(&self, now: u64) {
        let snapshot = self.registry.snapshot().await;
        let gate = self.registry.suppression().await;

        if gate.active {
            debug!(activated_at = gate.activated_at, "suppression gate active");
        }

        let mut reset_issued = false;

        for (id, record) in &snapshot {
            if !policy::is_stale(record, now) {
                continue;
            }

            // Fresh reads per stale workload so a sweep never acts on data
            // older than the evaluation itself.
            let inventory = self.docs.inventory_lookup(id);
            let last_update_release_at = self.docs.last_update_release_at();

            match policy::evaluate(record, now, inventory.as_ref(), last_update_release_at, &gate)
            {
                Decision::NoAction => {}
                Decision::Restart => {
                    info!(
                        workload = %id,
                        last_seen_at = record.last_seen_at,
                        "restarting stale workload"
                    );
                    if let Err(e) = self.actions.restart_workload(id).await {
                        warn!(workload = %id, error = %e, "restart action failed");
                    }
                    self.registry.mark_restart_issued(id, now).await;
                }
                Decision::FactoryReset => {
                    if reset_issued {
                        debug!(workload = %id, "factory reset already issued this sweep");
                        continue;
                    }
                    reset_issued = true;
                    warn!(workload = %id, "persistent failures, escalating to factory reset");
                    if let Err(e) = self.actions.factory_reset().await {
                        error!(error = %e, "factory reset failed");
                    }
                }
            }
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
