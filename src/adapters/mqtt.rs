//! MQTT broker adapter.
//!
//! Implements [`MessageLink`] with the same Idle / Connecting /
//! Connected / Error sub-state machine as the radio.
//!
//! ```text
//!  MQTT task (ESP-IDF)                       tick loop
//!  ───────────────────                       ─────────
//!  Connected      ──▶ flags.connected = 1
//!  Disconnected   ──▶ flags.connected = 0
//!  Received(t, d) ──▶ InboundMessage ──▶ EventQueue ──▶ Orchestrator
//! ```
//!
//! The client callback never parses or dispatches: it copies the topic
//! and payload into a bounded [`InboundMessage`] and returns.  Oversize
//! and fragmented payloads are dropped with a warning.
//!
//! Off-target builds use a simulated broker controlled by [`SimBroker`].

use std::sync::{Arc, OnceLock};

use log::{debug, info, warn};

use crate::app::ports::MessageLink;
use crate::config::NetworkConfig;
use crate::error::LinkError;
use crate::events::{EventQueue, InboundMessage, LinkEvent};

use super::link_state::{LinkFlags, LinkState, LinkStateMachine};

/// Broker sub-state.
pub type BrokerState = LinkState;

/// Inbox slot filled by `attach_inbox`, read by the client callback.
type InboxSlot = Arc<OnceLock<&'static EventQueue>>;

/// Copy a received message into the inbox.  Runs on the driver task.
fn enqueue_received(inbox: &InboxSlot, topic: &str, payload: &[u8]) {
    let Some(queue) = inbox.get() else {
        debug!("MQTT: message on {} before inbox attached, dropped", topic);
        return;
    };
    match InboundMessage::new(topic, payload) {
        Some(msg) => {
            queue.push(LinkEvent::Message(msg));
        }
        None => warn!(
            "MQTT: dropping oversized message on {} ({} bytes)",
            topic,
            payload.len()
        ),
    }
}

// ───────────────────────────────────────────────────────────────
// MQTT link
// ───────────────────────────────────────────────────────────────

pub struct MqttLink {
    machine: LinkStateMachine,
    flags: Arc<LinkFlags>,
    inbox: InboxSlot,
    config: NetworkConfig,
    #[cfg(target_os = "espidf")]
    client: Option<esp_idf_svc::mqtt::client::EspMqttClient<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimBroker,
}

impl MqttLink {
    pub fn state(&self) -> BrokerState {
        self.machine.state()
    }

    fn ensure_connected(&self) -> Result<(), LinkError> {
        if self.machine.is_connected() {
            Ok(())
        } else {
            Err(LinkError::NotConnected)
        }
    }
}

impl MessageLink for MqttLink {
    fn start(&mut self) {
        if !self.machine.begin_connect(&self.flags) {
            return;
        }
        if let Err(e) = self.platform_connect() {
            warn!("MQTT: connect to {} failed: {}", self.config.broker_uri, e);
            self.machine.connect_refused();
        }
    }

    fn update(&mut self) {
        self.machine.update(&self.flags);
    }

    fn is_connected(&self) -> bool {
        self.machine.is_connected()
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError> {
        self.ensure_connected()?;
        self.platform_publish(topic, payload)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), LinkError> {
        self.ensure_connected()?;
        self.platform_subscribe(topic)
    }

    fn attach_inbox(&mut self, inbox: &'static EventQueue) {
        if self.inbox.set(inbox).is_err() {
            debug!("MQTT: inbox already attached");
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF backend
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl MqttLink {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            machine: LinkStateMachine::new("MQTT"),
            flags: Arc::new(LinkFlags::new()),
            inbox: InboxSlot::default(),
            config: config.clone(),
            client: None,
        }
    }

    fn platform_connect(&mut self) -> Result<(), LinkError> {
        use esp_idf_svc::mqtt::client::{
            Details, EspMqttClient, EventPayload, MqttClientConfiguration,
        };

        // A previous session's client is torn down before reconnecting.
        self.client = None;

        let conf = MqttClientConfiguration {
            client_id: Some(self.config.client_id.as_str()),
            username: Some(self.config.access_token.as_str()).filter(|t| !t.is_empty()),
            ..Default::default()
        };

        let flags = self.flags.clone();
        let inbox = self.inbox.clone();
        let client = EspMqttClient::new_cb(self.config.broker_uri.as_str(), &conf, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => {
                    flags.set_connected(true);
                    if let Some(q) = inbox.get() {
                        q.push(LinkEvent::BrokerUp);
                    }
                }
                EventPayload::Disconnected => {
                    if flags.is_connected() {
                        flags.set_connected(false);
                        if let Some(q) = inbox.get() {
                            q.push(LinkEvent::BrokerDown);
                        }
                    } else {
                        flags.set_failed();
                    }
                }
                EventPayload::Error(e) => {
                    warn!("MQTT: client error: {:?}", e);
                    if !flags.is_connected() {
                        flags.set_failed();
                    }
                }
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    details: Details::Complete,
                    ..
                } => enqueue_received(&inbox, topic, data),
                EventPayload::Received { data, .. } => {
                    warn!("MQTT: dropping fragmented message ({} bytes)", data.len());
                }
                _ => {}
            }
        })
        .map_err(|_| LinkError::Driver)?;

        self.client = Some(client);
        info!("MQTT(espidf): session to {} requested", self.config.broker_uri);
        Ok(())
    }

    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError> {
        use esp_idf_svc::mqtt::client::QoS;

        let client = self.client.as_mut().ok_or(LinkError::NotConnected)?;
        client
            .enqueue(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|_| LinkError::PublishFailed)?;
        Ok(())
    }

    fn platform_subscribe(&mut self, topic: &str) -> Result<(), LinkError> {
        use esp_idf_svc::mqtt::client::QoS;

        let client = self.client.as_mut().ok_or(LinkError::NotConnected)?;
        client
            .subscribe(topic, QoS::AtMostOnce)
            .map_err(|_| LinkError::SubscribeFailed)?;
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation backend
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimBrokerLog {
    published: Vec<(String, Vec<u8>)>,
    subscriptions: Vec<String>,
    connects: u32,
    reject_connects: bool,
    fail_publish: bool,
}

/// Test handle for a simulated broker.
#[cfg(not(target_os = "espidf"))]
#[derive(Clone, Default)]
pub struct SimBroker {
    flags: Arc<LinkFlags>,
    inbox: InboxSlot,
    log: Arc<std::sync::Mutex<SimBrokerLog>>,
}

#[cfg(not(target_os = "espidf"))]
impl SimBroker {
    fn with_log<R>(&self, f: impl FnOnce(&mut SimBrokerLog) -> R) -> R {
        let mut log = self.log.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut log)
    }

    /// Close the session from the broker side.
    pub fn drop_link(&self) {
        self.flags.set_connected(false);
    }

    /// Bring the session back without a new connect request, as the
    /// esp-mqtt client's own reconnect does.
    pub fn restore_link(&self) {
        self.flags.set_connected(true);
    }

    pub fn reject_connects(&self, reject: bool) {
        self.with_log(|l| l.reject_connects = reject);
    }

    pub fn fail_publish(&self, fail: bool) {
        self.with_log(|l| l.fail_publish = fail);
    }

    /// Deliver a message as the client callback would.
    pub fn inject(&self, topic: &str, payload: &[u8]) {
        enqueue_received(&self.inbox, topic, payload);
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.with_log(|l| l.published.clone())
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.with_log(|l| l.subscriptions.clone())
    }

    pub fn connect_count(&self) -> u32 {
        self.with_log(|l| l.connects)
    }

    pub fn inbox_attached(&self) -> bool {
        self.inbox.get().is_some()
    }
}

#[cfg(not(target_os = "espidf"))]
impl MqttLink {
    /// A simulated link plus the handle that controls it.
    pub fn simulated(config: &NetworkConfig) -> (Self, SimBroker) {
        let sim = SimBroker::default();
        let link = Self {
            machine: LinkStateMachine::new("MQTT"),
            flags: sim.flags.clone(),
            inbox: sim.inbox.clone(),
            config: config.clone(),
            sim: sim.clone(),
        };
        (link, sim)
    }

    fn platform_connect(&mut self) -> Result<(), LinkError> {
        let rejected = self.sim.with_log(|l| {
            l.connects += 1;
            l.reject_connects
        });
        if rejected {
            warn!("MQTT(sim): broker {} refused session", self.config.broker_uri);
            self.flags.set_failed();
        } else {
            info!("MQTT(sim): session to {} up", self.config.broker_uri);
            self.flags.set_connected(true);
        }
        Ok(())
    }

    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError> {
        self.sim.with_log(|l| {
            if l.fail_publish {
                return Err(LinkError::PublishFailed);
            }
            l.published.push((topic.into(), payload.to_vec()));
            Ok(())
        })
    }

    fn platform_subscribe(&mut self, topic: &str) -> Result<(), LinkError> {
        self.sim.with_log(|l| l.subscriptions.push(topic.into()));
        Ok(())
    }
}
