//! fleetwatch-mqtt — broker plumbing and the control-command dispatcher.
//!
//! # Architecture
//!
//! ```text
//! broker
//!   │  restart / service / ping_check / update topics (QoS 1)
//!   ▼
//! rumqttc event loop ── Publish packet ──► spawned handler task
//!                                             │
//!                                             ├── Dispatcher::dispatch()
//!                                             │     registry writes, action calls
//!                                             ▼
//!                                          optional liveness ack ──► broker
//! ```
//!
//! Handlers for different messages run concurrently; every shared mutation
//! goes through the registry's synchronized operations. Failing to connect
//! or subscribe at startup aborts the daemon — after startup, connection
//! errors are logged and retried, never fatal.

pub mod client;
pub mod dispatch;

pub use client::{MqttClient, MqttSettings, Topics};
pub use dispatch::{ControlCommand, Dispatcher, OutboundMessage};
