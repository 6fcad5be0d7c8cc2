//! External fleet documents consulted by the escalation policy.
//!
//! Two small JSON files maintained outside the watchdog:
//!
//! - the workload inventory, `{ "<id>": { "restart_count": n, ... }, ... }`
//! - the update metadata, `{ "release_date": <epoch secs> }`
//!
//! Both are re-read on every lookup so a sweep always sees current data.
//! A missing or malformed document is a defined degraded state, never an
//! error the caller has to handle: the inventory degrades to "workload
//! unknown" and the update metadata to a release date of 0.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

/// Inventory data for one workload. Extra fields in the document are
/// ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InventoryEntry {
    /// How many times the external runtime has restarted this workload.
    pub restart_count: u32,
}

/// Paths to the fleet documents.
#[derive(Debug, Clone)]
pub struct ExternalDocs {
    inventory_path: PathBuf,
    update_info_path: PathBuf,
}

/// Shape of the update metadata document.
#[derive(Debug, Deserialize)]
struct UpdateInfo {
    release_date: u64,
}

impl ExternalDocs {
    pub fn new(inventory_path: PathBuf, update_info_path: PathBuf) -> Self {
        Self {
            inventory_path,
            update_info_path,
        }
    }

    /// Look up a workload in the inventory document.
    ///
    /// Returns `None` when the document is missing or unreadable, when the
    /// workload has no entry, or when its entry does not parse — all of
    /// which the policy treats as "unknown workload". Degraded reads are
    /// logged once per lookup.
    pub fn inventory_lookup(&self, id: &str) -> Option<InventoryEntry> {
        let content = match std::fs::read_to_string(&self.inventory_path) {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    path = %self.inventory_path.display(),
                    error = %e,
                    "inventory document unreadable, treating workloads as unknown"
                );
                return None;
            }
        };

        let doc: serde_json::Map<String, serde_json::Value> =
            match serde_json::from_str(&content) {
                Ok(d) => d,
                Err(e) => {
                    warn!(
                        path = %self.inventory_path.display(),
                        error = %e,
                        "inventory document malformed, treating workloads as unknown"
                    );
                    return None;
                }
            };

        let value = doc.get(id)?;
        match serde_json::from_value::<InventoryEntry>(value.clone()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(workload = %id, error = %e, "inventory entry malformed");
                None
            }
        }
    }

    /// Epoch seconds of the last software update release.
    ///
    /// Returns 0 when the document is missing or malformed, failing toward
    /// the restart branch of the policy.
    pub fn last_update_release_at(&self) -> u64 {
        let content = match std::fs::read_to_string(&self.update_info_path) {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    path = %self.update_info_path.display(),
                    error = %e,
                    "update metadata unreadable"
                );
                return 0;
            }
        };

        match serde_json::from_str::<UpdateInfo>(&content) {
            Ok(info) => info.release_date,
            Err(e) => {
                warn!(
                    path = %self.update_info_path.display(),
                    error = %e,
                    "update metadata malformed"
                );
                0
            }
        }
    }
}
