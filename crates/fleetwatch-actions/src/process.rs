//! Process-control actions.
//!
//! Containers are driven through the `docker` CLI, system services through
//! `systemctl`, and the factory reset through a configurable script. Every
//! identifier is validated before it reaches an argv vector; nothing here
//! goes through a shell.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{ActionError, ActionResult};

/// Boxed future returned by [`WorkloadActions`] methods, keeping the trait
/// dyn-safe for sharing between the sweep loop and the dispatcher.
pub type ActionFuture = std::pin::Pin<
    Box<dyn std::future::Future<Output = ActionResult<()>> + Send>,
>;

/// External control actions available to the watchdog.
///
/// Implementations report success or failure; callers log failures and
/// never propagate them as crashes — the next sweep or the next explicit
/// command is the retry.
pub trait WorkloadActions: Send + Sync {
    fn restart_workload(&self, id: &str) -> ActionFuture;
    fn start_workload(&self, id: &str) -> ActionFuture;
    fn stop_workload(&self, id: &str) -> ActionFuture;
    fn start_service(&self, name: &str) -> ActionFuture;
    fn stop_service(&self, name: &str) -> ActionFuture;
    /// Fleet-wide factory reset. Not scoped to a workload.
    fn factory_reset(&self) -> ActionFuture;
}

/// Maximum accepted identifier length (docker ids are 64 hex chars; unit
/// names are shorter in practice).
const MAX_NAME_LEN: usize = 128;

/// Validate a container id or service name before it is passed to a
/// subprocess argv.
pub fn validate_name(name: &str) -> ActionResult<()> {
    let ok = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '@' | ':'));
    if ok {
        Ok(())
    } else {
        Err(ActionError::InvalidName(name.to_string()))
    }
}

/// [`WorkloadActions`] implementation that shells out to the host's
/// `docker` and `systemctl` binaries.
pub struct ProcessActions {
    /// Script executed for a factory reset.
    factory_reset_script: PathBuf,
}

impl ProcessActions {
    pub fn new(factory_reset_script: PathBuf) -> Self {
        Self {
            factory_reset_script,
        }
    }
}

impl WorkloadActions for ProcessActions {
    fn restart_workload(&self, id: &str) -> ActionFuture {
        let id = id.to_string();
        Box::pin(async move { run_docker("restart", &id).await })
    }

    fn start_workload(&self, id: &str) -> ActionFuture {
        let id = id.to_string();
        Box::pin(async move { run_docker("start", &id).await })
    }

    fn stop_workload(&self, id: &str) -> ActionFuture {
        let id = id.to_string();
        Box::pin(async move { run_docker("stop", &id).await })
    }

    fn start_service(&self, name: &str) -> ActionFuture {
        let name = name.to_string();
        Box::pin(async move { run_systemctl("start", &name).await })
    }

    fn stop_service(&self, name: &str) -> ActionFuture {
        let name = name.to_string();
        Box::pin(async move { run_systemctl("stop", &name).await })
    }

    fn factory_reset(&self) -> ActionFuture {
        let script = self.factory_reset_script.clone();
        Box::pin(async move {
            info!(script = %script.display(), "running factory reset");
            run_checked(Command::new("/bin/sh").arg(&script), "factory reset script").await
        })
    }
}

async fn run_docker(verb: &str, id: &str) -> ActionResult<()> {
    validate_name(id)?;
    debug!(%verb, container = %id, "invoking docker");
    run_checked(
        Command::new("docker").arg(verb).arg(id),
        &format!("docker {verb} {id}"),
    )
    .await
}

async fn run_systemctl(verb: &str, name: &str) -> ActionResult<()> {
    validate_name(name)?;
    debug!(%verb, service = %name, "invoking systemctl");
    run_checked(
        Command::new("sudo").args(["systemctl", verb, name]),
        &format!("systemctl {verb} {name}"),
    )
    .await
}

/// Run a prepared command to completion, mapping spawn failures and
/// non-zero exits into `ActionError`.
async fn run_checked(command: &mut Command, label: &str) -> ActionResult<()> {
    let output = command.output().await.map_err(|e| ActionError::Spawn {
        command: label.to_string(),
        source: e,
    })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(ActionError::Failed {
            command: label.to_string(),
            status: output.status.to_string(),
        })
    }
}
