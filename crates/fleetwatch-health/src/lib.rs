//! fleetwatch-health — staleness detection and escalation for the fleet.
//!
//! # Escalation policy
//!
//! ```text
//! for each workload not heard from in 120s:
//!
//!   suppression gate active < 1h  →  no action (planned update window)
//!   not in the inventory          →  restart (assumed freshly provisioned)
//!   restart_count >= 5 and last
//!     update older than 1h        →  factory reset (fleet-wide, once per sweep)
//!   otherwise                     →  restart, unless one was already issued
//!                                    less than 6000s ago (cooldown)
//! ```
//!
//! The policy itself ([`policy::evaluate`]) is a pure function; the
//! [`sweep::HealthSweep`] task drives it every 30 seconds over a registry
//! snapshot and applies the decisions through [`WorkloadActions`].
//!
//! [`WorkloadActions`]: fleetwatch_actions::WorkloadActions

pub mod policy;
pub mod sweep;

pub use policy::{Decision, evaluate, is_stale};
pub use sweep::HealthSweep;
