//! MQTT broker client.
//!
//! Wraps a rumqttc `AsyncClient`: subscribes to the four control topics,
//! dispatches each publish on its own task, and publishes liveness acks
//! fire-and-forget. Startup connect/subscribe failures are fatal; anything
//! after that is logged and retried.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;

/// Seconds between MQTT keep-alive pings.
const KEEP_ALIVE_SECS: u64 = 60;

/// Backoff after a post-startup connection error.
const RECONNECT_DELAY_SECS: u64 = 1;

/// Topics the watchdog subscribes to (QoS 1). The ping-check topic doubles
/// as the outbound liveness-ack topic.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Topics {
    pub restart: String,
    pub service: String,
    pub ping_check: String,
    pub update: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            restart: "avi/local/restart_me".to_string(),
            service: "avi/local/service".to_string(),
            ping_check: "avi/threat/health".to_string(),
            update: "avi/threat/update".to_string(),
        }
    }
}

impl Topics {
    fn all(&self) -> [&str; 4] {
        [&self.restart, &self.service, &self.ping_check, &self.update]
    }
}

/// Broker connection settings, static at startup.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MqttSettings {
    pub broker_host: String,
    pub broker_port: u16,
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub topics: Topics,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            broker_host: "0.0.0.0".to_string(),
            broker_port: 1883,
            username: String::new(),
            password: String::new(),
            client_id: default_client_id(),
            topics: Topics::default(),
        }
    }
}

/// Unique-enough default client id for a single-instance watchdog.
fn default_client_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("fleetwatchd-{nanos}")
}

/// The watchdog's MQTT client loop.
pub struct MqttClient {
    settings: MqttSettings,
    dispatcher: Arc<Dispatcher>,
}

impl MqttClient {
    pub fn new(settings: MqttSettings, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            settings,
            dispatcher,
        }
    }

    /// Connect and serve until the shutdown signal flips.
    ///
    /// Returns an error only when the initial connection or the initial
    /// subscriptions fail — the watchdog cannot do its job without them.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let mut options = MqttOptions::new(
            &self.settings.client_id,
            &self.settings.broker_host,
            self.settings.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(KEEP_ALIVE_SECS));
        if !self.settings.username.is_empty() {
            options.set_credentials(&self.settings.username, &self.settings.password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 64);
        let mut connected_once = false;

        info!(
            host = %self.settings.broker_host,
            port = self.settings.broker_port,
            client_id = %self.settings.client_id,
            "connecting to broker"
        );

        loop {
            tokio::select! {
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("connected to broker");
                        // rumqttc does not replay subscriptions across
                        // reconnects, so they are (re)issued on every ConnAck.
                        let result = self.subscribe_all(&client).await;
                        if !connected_once {
                            result.context("initial topic subscription failed")?;
                            connected_once = true;
                            info!(topics = ?self.settings.topics.all(), "listening for control messages");
                        } else if let Err(e) = result {
                            warn!(error = %e, "resubscription failed");
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        debug!(topic = %publish.topic, bytes = publish.payload.len(), "message received");
                        let dispatcher = self.dispatcher.clone();
                        let client = client.clone();
                        // Handlers run concurrently; the registry's locking
                        // is the only serialization point.
                        tokio::spawn(async move {
                            let outbound = dispatcher.dispatch(&publish.payload, epoch_secs()).await;
                            if let Some(message) = outbound
                                && let Err(e) = client
                                    .publish(message.topic, QoS::AtLeastOnce, false, message.payload)
                                    .await
                            {
                                warn!(error = %e, "liveness ack publish failed");
                            }
                        });
                    }
                    Ok(_) => {}
                    Err(e) if !connected_once => {
                        return Err(e).context("failed to establish broker connection");
                    }
                    Err(e) => {
                        warn!(error = %e, "broker connection lost, retrying");
                        tokio::time::sleep(Duration::from_secs(RECONNECT_DELAY_SECS)).await;
                    }
                },
                _ = shutdown.changed() => {
                    info!("mqtt client shutting down");
                    let _ = client.disconnect().await;
                    break;
                }
            }
        }

        Ok(())
    }

    async fn subscribe_all(&self, client: &AsyncClient) -> anyhow::Result<()> {
        for topic in self.settings.topics.all() {
            client
                .subscribe(topic, QoS::AtLeastOnce)
                .await
                .with_context(|| format!("subscribe to {topic}"))?;
        }
        Ok(())
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
