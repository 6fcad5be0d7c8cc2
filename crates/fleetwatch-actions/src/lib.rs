//! fleetwatch-actions — the watchdog's external collaborators.
//!
//! Two concerns live here, both opaque to the core state machine:
//!
//! - [`process`]: OS-level control actions (restart/start/stop a container,
//!   start/stop a system service, run the factory-reset procedure). All of
//!   them spawn validated argv vectors, never a shell string.
//! - [`docs`]: the two external JSON documents the escalation policy
//!   consults — the workload inventory (per-workload restart counters) and
//!   the update metadata (last release date). Both are read fresh on every
//!   lookup and degrade to defined fallbacks when missing or malformed.

pub mod docs;
pub mod error;
pub mod process;

pub use docs::{ExternalDocs, InventoryEntry};
pub use error::{ActionError, ActionResult};
pub use process::{ActionFuture, ProcessActions, WorkloadActions};
