//! fleetwatch-registry — in-memory liveness state for the fleet watchdog.
//!
//! Holds one `LivenessRecord` per workload that has heartbeated since the
//! last history clear, plus the single global `SuppressionGate` used during
//! planned update windows.
//!
//! # Architecture
//!
//! The `Registry` is `Clone` + `Send` + `Sync` (backed by
//! `Arc<tokio::sync::RwLock<..>>`) and is the sole owner of shared mutable
//! state in the watchdog: the sweep loop and the command dispatcher both go
//! through its operations, never the underlying maps. State is memory-only —
//! the watchdog deliberately forgets all health history on restart.

pub mod registry;
pub mod types;

pub use registry::Registry;
pub use types::{LivenessRecord, SuppressionGate, WorkloadId};
