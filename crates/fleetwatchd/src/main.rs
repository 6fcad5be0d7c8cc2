//! fleetwatchd — the fleet watchdog daemon.
//!
//! Single binary that assembles the watchdog subsystems:
//! - Liveness registry (in-memory)
//! - Health sweep loop (staleness → restart → factory reset)
//! - Process-control actions (docker / systemctl / reset script)
//! - MQTT client + control-command dispatcher
//!
//! # Usage
//!
//! ```text
//! fleetwatchd --config /etc/fleetwatch.toml
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use fleetwatch_actions::{ExternalDocs, ProcessActions, WorkloadActions};
use fleetwatch_health::HealthSweep;
use fleetwatch_mqtt::{Dispatcher, MqttClient};
use fleetwatch_registry::Registry;

use crate::config::WatchdogConfig;

#[derive(Parser)]
#[command(name = "fleetwatchd", about = "Fleet watchdog daemon")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the broker host.
    #[arg(long)]
    broker_host: Option<String>,

    /// Override the broker port.
    #[arg(long)]
    broker_port: Option<u16>,

    /// Override the workload inventory document path.
    #[arg(long)]
    inventory_path: Option<PathBuf>,

    /// Override the update metadata document path.
    #[arg(long)]
    update_info_path: Option<PathBuf>,

    /// Override the factory reset script path.
    #[arg(long)]
    factory_reset_script: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<WatchdogConfig> {
        let mut config = match &self.config {
            Some(path) => WatchdogConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => WatchdogConfig::default(),
        };

        if let Some(host) = self.broker_host {
            config.mqtt.broker_host = host;
        }
        if let Some(port) = self.broker_port {
            config.mqtt.broker_port = port;
        }
        if let Some(path) = self.inventory_path {
            config.inventory_path = path;
        }
        if let Some(path) = self.update_info_path {
            config.update_info_path = path;
        }
        if let Some(path) = self.factory_reset_script {
            config.factory_reset_script = path;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleetwatchd=debug,fleetwatch=debug".parse().unwrap()),
        )
        .init();

    let config = Cli::parse().into_config()?;
    run(config).await
}

async fn run(config: WatchdogConfig) -> anyhow::Result<()> {
    info!("fleet watchdog starting");

    // ── Assemble subsystems ────────────────────────────────────────

    let registry = Registry::new();

    let actions: Arc<dyn WorkloadActions> =
        Arc::new(ProcessActions::new(config.factory_reset_script.clone()));

    let docs = ExternalDocs::new(
        config.inventory_path.clone(),
        config.update_info_path.clone(),
    );
    info!(
        inventory = %config.inventory_path.display(),
        update_info = %config.update_info_path.display(),
        "external documents configured"
    );

    let sweep = HealthSweep::new(registry.clone(), actions.clone(), docs);

    let dispatcher = Arc::new(Dispatcher::new(
        registry.clone(),
        actions.clone(),
        config.mqtt.topics.ping_check.clone(),
    ));
    let client = MqttClient::new(config.mqtt, dispatcher);

    // ── Shutdown signal ────────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Background tasks ───────────────────────────────────────────

    let sweep_handle = tokio::spawn(sweep.run(shutdown_rx.clone()));
    let mut client_handle = tokio::spawn(client.run(shutdown_rx));

    // Serve until interrupted, or until the client fails fatally at
    // startup (no broker means no watchdog).
    let client_result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to install CTRL+C handler")?;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
            (&mut client_handle).await?
        }
        result = &mut client_handle => {
            let _ = shutdown_tx.send(true);
            result?
        }
    };

    let _ = sweep_handle.await;
    client_result?;

    info!("fleet watchdog stopped");
    Ok(())
}
