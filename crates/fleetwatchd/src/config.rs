//! fleetwatch.toml configuration parser.
//!
//! Everything here is static at startup: broker settings, topic names, and
//! the paths of the external collaborators. Escalation thresholds are
//! compile-time constants in fleetwatch-health, deliberately not exposed
//! here.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use fleetwatch_mqtt::MqttSettings;

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WatchdogConfig {
    pub mqtt: MqttSettings,
    /// Workload inventory document (per-workload restart counters).
    pub inventory_path: PathBuf,
    /// Update metadata document (last release date).
    pub update_info_path: PathBuf,
    /// Script run for a fleet-wide factory reset.
    pub factory_reset_script: PathBuf,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttSettings::default(),
            inventory_path: PathBuf::from("/ws/services/container_infos.json"),
            update_info_path: PathBuf::from("/ws/services/version.json"),
            factory_reset_script: PathBuf::from("factory_reset.sh"),
        }
    }
}

impl WatchdogConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WatchdogConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
