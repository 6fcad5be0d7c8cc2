//! Control-command dispatcher.
//!
//! Stateless router over decoded inbound payloads. Heartbeats mutate the
//! registry; manual container/service commands call the matching action
//! directly, bypassing the registry. Malformed payloads and unknown
//! commands are logged no-ops — nothing inbound can crash the watchdog.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use fleetwatch_actions::WorkloadActions;
use fleetwatch_registry::Registry;

/// Sender id the watchdog uses for its own liveness acks. Heartbeats
/// carrying it are our own reflections, not a managed workload.
pub const RESERVED_SENDER_ID: &str = "management_service";

/// The inbound control protocol: flat JSON objects tagged by `command`.
/// Unknown fields are ignored; unknown commands and missing required
/// fields fail deserialization and are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ControlCommand {
    RestartContainer {
        container_id: String,
    },
    StartContainer {
        container_id: String,
    },
    StopContainer {
        container_id: String,
    },
    ClearContainerHistory,
    Ping {
        container_id: String,
        #[serde(default)]
        boot_time_timestamp: Option<u64>,
    },
    UpdatePending {
        status: bool,
    },
    StopService {
        service_name: String,
    },
    StartService {
        service_name: String,
    },
}

/// A message the caller should publish after dispatch (fire-and-forget).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Routes decoded control messages to the registry and the actions.
pub struct Dispatcher {
    registry: Registry,
    actions: Arc<dyn WorkloadActions>,
    /// Topic liveness acks are published on.
    health_topic: String,
}

impl Dispatcher {
    pub fn new(registry: Registry, actions: Arc<dyn WorkloadActions>, health_topic: String) -> Self {
        Self {
            registry,
            actions,
            health_topic,
        }
    }

    /// Handle one inbound payload at the given time.
    ///
    /// Returns the liveness ack to publish, if the message was a heartbeat
    /// from a managed workload.
    pub async fn dispatch(&self, payload: &[u8], now: u64) -> Option<OutboundMessage> {
        let command = match serde_json::from_slice::<ControlCommand>(payload) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "dropping unparseable control message");
                return None;
            }
        };

        match command {
            ControlCommand::Ping {
                container_id,
                boot_time_timestamp,
            } => {
                if container_id == RESERVED_SENDER_ID {
                    return None;
                }
                self.registry
                    .record_heartbeat(&container_id, now, boot_time_timestamp)
                    .await;
                Some(self.liveness_ack(now))
            }
            ControlCommand::RestartContainer { container_id } => {
                info!(container = %container_id, "manual restart requested");
                if let Err(e) = self.actions.restart_workload(&container_id).await {
                    warn!(container = %container_id, error = %e, "restart failed");
                }
                None
            }
            ControlCommand::StartContainer { container_id } => {
                info!(container = %container_id, "manual start requested");
                if let Err(e) = self.actions.start_workload(&container_id).await {
                    warn!(container = %container_id, error = %e, "start failed");
                }
                None
            }
            ControlCommand::StopContainer { container_id } => {
                info!(container = %container_id, "manual stop requested");
                if let Err(e) = self.actions.stop_workload(&container_id).await {
                    warn!(container = %container_id, error = %e, "stop failed");
                }
                None
            }
            ControlCommand::ClearContainerHistory => {
                info!("clearing liveness history");
                self.registry.clear_all().await;
                None
            }
            ControlCommand::UpdatePending { status } => {
                info!(status, "update pending notification");
                self.registry.set_suppression(status, now).await;
                None
            }
            ControlCommand::StopService { service_name } => {
                info!(service = %service_name, "service stop requested");
                if let Err(e) = self.actions.stop_service(&service_name).await {
                    warn!(service = %service_name, error = %e, "service stop failed");
                }
                None
            }
            ControlCommand::StartService { service_name } => {
                info!(service = %service_name, "service start requested");
                if let Err(e) = self.actions.start_service(&service_name).await {
                    warn!(service = %service_name, error = %e, "service start failed");
                }
                None
            }
        }
    }

    /// The ack echoed back for every managed-workload heartbeat.
    fn liveness_ack(&self, now: u64) -> OutboundMessage {
        let payload = serde_json::json!({
            "command": "ping",
            "timestamp": now,
            "container_id": RESERVED_SENDER_ID,
        });
        OutboundMessage {
            topic: self.health_topic.clone(),
            payload: serde_json::to_vec(&payload).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use fleetwatch_actions::{ActionError, ActionFuture};

    #[derive(Default)]
    struct RecordingActions {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingActions {
        fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) -> ActionFuture {
            self.calls.lock().unwrap().push(call.clone());
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    Err(ActionError::Failed {
                        command: call,
                        status: "exit status: 1".to_string(),
                    })
                } else {
                    Ok(())
                }
            })
        }
    }

    impl WorkloadActions for RecordingActions {
        fn restart_workload(&self, id: &str) -> ActionFuture {
            self.record(format!("restart:{id}"))
        }
        fn start_workload(&self, id: &str) -> ActionFuture {
            self.record(format!("start:{id}"))
        }
        fn stop_workload(&self, id: &str) -> ActionFuture {
            self.record(format!("stop:{id}"))
        }
        fn start_service(&self, name: &str) -> ActionFuture {
            self.record(format!("start_service:{name}"))
        }
        fn stop_service(&self, name: &str) -> ActionFuture {
            self.record(format!("stop_service:{name}"))
        }
        fn factory_reset(&self) -> ActionFuture {
            self.record("factory_reset".to_string())
        }
    }

    fn dispatcher() -> (Registry, Arc<RecordingActions>, Dispatcher) {
        let registry = Registry::new();
        let actions = Arc::new(RecordingActions::default());
        let dispatcher = Dispatcher::new(
            registry.clone(),
            actions.clone(),
            "avi/threat/health".to_string(),
        );
        (registry, actions, dispatcher)
    }

    #[tokio::test]
    async fn ping_upserts_and_acks() {
        let (registry, _actions, dispatcher) = dispatcher();

        let out = dispatcher
            .dispatch(br#"{"command":"ping","container_id":"svc-1","timestamp":999}"#, 1000)
            .await
            .unwrap();

        let record = registry.get("svc-1").await.unwrap();
        assert_eq!(record.last_seen_at, 1000);
        assert!(!record.restart_requested);

        assert_eq!(out.topic, "avi/threat/health");
        let ack: serde_json::Value = serde_json::from_slice(&out.payload).unwrap();
        assert_eq!(ack["command"], "ping");
        assert_eq!(ack["container_id"], RESERVED_SENDER_ID);
        assert_eq!(ack["timestamp"], 1000);
    }

    #[tokio::test]
    async fn ping_carries_boot_time() {
        let (registry, _actions, dispatcher) = dispatcher();

        dispatcher
            .dispatch(
                br#"{"command":"ping","container_id":"svc-1","boot_time_timestamp":950}"#,
                1000,
            )
            .await;

        assert_eq!(registry.get("svc-1").await.unwrap().boot_time, Some(950));
    }

    #[tokio::test]
    async fn reserved_sender_ping_is_ignored() {
        let (registry, _actions, dispatcher) = dispatcher();

        let out = dispatcher
            .dispatch(
                br#"{"command":"ping","container_id":"management_service"}"#,
                1000,
            )
            .await;

        assert!(out.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn manual_container_commands_invoke_actions() {
        let (_registry, actions, dispatcher) = dispatcher();

        dispatcher
            .dispatch(br#"{"command":"restart_container","container_id":"svc-1"}"#, 0)
            .await;
        dispatcher
            .dispatch(br#"{"command":"start_container","container_id":"svc-2"}"#, 0)
            .await;
        dispatcher
            .dispatch(br#"{"command":"stop_container","container_id":"svc-3"}"#, 0)
            .await;

        assert_eq!(
            actions.calls(),
            vec!["restart:svc-1", "start:svc-2", "stop:svc-3"]
        );
    }

    #[tokio::test]
    async fn service_commands_invoke_actions() {
        let (_registry, actions, dispatcher) = dispatcher();

        dispatcher
            .dispatch(br#"{"command":"stop_service","service_name":"nginx"}"#, 0)
            .await;
        dispatcher
            .dispatch(br#"{"command":"start_service","service_name":"nginx"}"#, 0)
            .await;

        assert_eq!(actions.calls(), vec!["stop_service:nginx", "start_service:nginx"]);
    }

    #[tokio::test]
    async fn action_failures_are_swallowed() {
        let registry = Registry::new();
        let actions = Arc::new(RecordingActions::failing());
        let dispatcher = Dispatcher::new(registry, actions.clone(), "t".to_string());

        let out = dispatcher
            .dispatch(br#"{"command":"restart_container","container_id":"svc-1"}"#, 0)
            .await;

        assert!(out.is_none());
        assert_eq!(actions.calls(), vec!["restart:svc-1"]);
    }

    #[tokio::test]
    async fn clear_history_empties_registry() {
        let (registry, _actions, dispatcher) = dispatcher();
        registry.record_heartbeat("svc-1", 900, None).await;
        registry.record_heartbeat("svc-2", 901, None).await;

        dispatcher
            .dispatch(br#"{"command":"clear_container_history"}"#, 1000)
            .await;

        assert!(registry.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn update_pending_toggles_suppression() {
        let (registry, _actions, dispatcher) = dispatcher();

        dispatcher
            .dispatch(br#"{"command":"update_pending","status":true}"#, 5000)
            .await;
        let gate = registry.suppression().await;
        assert!(gate.active);
        assert_eq!(gate.activated_at, 5000);

        dispatcher
            .dispatch(br#"{"command":"update_pending","status":false}"#, 6000)
            .await;
        let gate = registry.suppression().await;
        assert!(!gate.active);
        assert_eq!(gate.activated_at, 0);
    }

    #[tokio::test]
    async fn malformed_and_unknown_messages_are_noops() {
        let (registry, actions, dispatcher) = dispatcher();

        for payload in [
            b"not json at all".as_slice(),
            br#"{"no_command": true}"#.as_slice(),
            br#"{"command":"self_destruct"}"#.as_slice(),
            // missing container_id
            br#"{"command":"restart_container"}"#.as_slice(),
            // wrong type
            br#"{"command":"update_pending","status":"yes"}"#.as_slice(),
        ] {
            assert!(dispatcher.dispatch(payload, 1000).await.is_none());
        }

        assert!(registry.is_empty().await);
        assert!(actions.calls().is_empty());
    }

    #[tokio::test]
    async fn concurrent_pings_all_register() {
        let (registry, _actions, dispatcher) = dispatcher();
        let dispatcher = Arc::new(dispatcher);

        let mut handles = Vec::new();
        for i in 0..16 {
            let dispatcher = dispatcher.clone();
            handles.push(tokio::spawn(async move {
                let payload =
                    format!(r#"{{"command":"ping","container_id":"svc-{i}"}}"#);
                dispatcher.dispatch(payload.as_bytes(), 1000 + i).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.len().await, 16);
    }
}
