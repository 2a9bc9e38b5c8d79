//! Connectivity orchestrator: the hexagonal core.
//!
//! [`Orchestrator`] owns the phase machine, the RPC dispatcher and the
//! three transport ports.  It is the only component that connects,
//! subscribes or publishes.
//!
//! ```text
//!  RadioLink ───┐                          ┌──▶ EventSink
//!  MessageLink ─┼──▶ ┌──────────────────┐ ─┤
//!  TimeSync ────┘    │   Orchestrator   │  └──▶ MessageLink::publish
//!  EventQueue ──────▶│ FSM · Dispatcher │
//!                    └────────┬─────────┘
//!                             ▼
//!                      DeviceServices (config store, feeder, readings)
//! ```
//!
//! One [`update`](Orchestrator::update) per scheduler tick:
//!
//! 1. advance both link sub-state machines
//! 2. drain the inbox, routing broker messages
//! 3. snapshot link / sync status into the phase context
//! 4. run exactly one phase handler
//! 5. apply the handler's link requests
//! 6. emit `PhaseChanged` if the phase moved
//!
//! Nothing here sleeps; waiting is re-polling on the next tick.

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::error::LinkError;
use crate::events::{EventQueue, InboundMessage, LinkEvent};
use crate::fsm::context::{LinkSnapshot, PhaseContext};
use crate::fsm::states::build_phase_table;
use crate::fsm::{ConnectionPhase, Fsm};
use crate::rpc::{DispatchOutcome, RpcDispatcher};
use crate::topics::{self, ATTRIBUTES_TOPIC, RPC_REQUEST_TOPIC, TELEMETRY_TOPIC};

use super::events::{AppEvent, LinkKind, TelemetryData};
use super::ports::{
    ConnectivityStatus, DeviceServices, EventSink, MessageLink, RadioLink, TimeSync,
};

// ───────────────────────────────────────────────────────────────
// Orchestrator
// ───────────────────────────────────────────────────────────────

pub struct Orchestrator<R, M, T> {
    radio: R,
    message: M,
    time: T,
    dispatcher: RpcDispatcher,
    inbox: &'static EventQueue,
    fsm: Fsm,
    ctx: PhaseContext,
    tick_count: u64,
}

impl<R, M, T> Orchestrator<R, M, T>
where
    R: RadioLink,
    M: MessageLink,
    T: TimeSync,
{
    /// Construct the orchestrator in `Init`.
    ///
    /// Does **not** run the initial phase entry; call [`start`](Self::start) next.
    pub fn new(
        radio: R,
        message: M,
        time: T,
        dispatcher: RpcDispatcher,
        inbox: &'static EventQueue,
        telemetry_interval_ms: u32,
    ) -> Self {
        Self {
            radio,
            message,
            time,
            dispatcher,
            inbox,
            fsm: Fsm::new(build_phase_table(), ConnectionPhase::Init),
            ctx: PhaseContext::new(u64::from(telemetry_interval_ms)),
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_phase()));
        info!("Orchestrator started in {:?}", self.fsm.current_phase());
    }

    /// External reset: `Fault` → `Init`.  A no-op in any other phase.
    /// Returns `true` if the reset was applied.
    pub fn reset(&mut self, sink: &mut impl EventSink) -> bool {
        let from = self.fsm.current_phase();
        if from != ConnectionPhase::Fault {
            debug!("Orchestrator: reset ignored in {:?}", from);
            return false;
        }
        self.fsm.force_transition(ConnectionPhase::Init, &mut self.ctx);
        sink.emit(&AppEvent::PhaseChanged {
            from,
            to: ConnectionPhase::Init,
        });
        true
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one tick.  `device` satisfies every capability the RPC
    /// handlers and telemetry need.
    pub fn update<D: DeviceServices>(&mut self, now_ms: u64, device: &mut D, sink: &mut impl EventSink) {
        self.tick_count += 1;
        let prev_phase = self.fsm.current_phase();

        // 1. Link sub-state machines observe driver flags
        self.radio.update();
        self.message.update();

        // 2. Callback events queued since the last tick
        let inbox = self.inbox;
        while let Some(event) = inbox.pop() {
            self.handle_link_event(event, device, sink);
        }

        // 3. Status snapshot
        let links = LinkSnapshot {
            radio_connected: self.radio.is_connected(),
            broker_connected: self.message.is_connected(),
            time_synced: self.time.is_synced(),
        };
        self.report_link_loss(&links, sink);
        self.ctx.links = links;
        self.ctx.now_ms = now_ms;

        // 4. Exactly one phase handler
        self.ctx.requests.clear();
        self.fsm.tick(&mut self.ctx);

        // 5. Side effects requested by the handler
        self.apply_requests(device, sink);

        // 6. Phase change notification
        let phase = self.fsm.current_phase();
        if phase != prev_phase {
            sink.emit(&AppEvent::PhaseChanged {
                from: prev_phase,
                to: phase,
            });
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn dispatcher(&self) -> &RpcDispatcher {
        &self.dispatcher
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn message_link(&self) -> &M {
        &self.message
    }

    pub fn message_link_mut(&mut self) -> &mut M {
        &mut self.message
    }

    pub fn time_source(&self) -> &T {
        &self.time
    }

    pub fn time_source_mut(&mut self) -> &mut T {
        &mut self.time
    }

    // ── Internal ──────────────────────────────────────────────

    fn handle_link_event<D: DeviceServices>(
        &mut self,
        event: LinkEvent,
        device: &mut D,
        sink: &mut impl EventSink,
    ) {
        match event {
            LinkEvent::RadioUp => debug!("Orchestrator: radio up"),
            LinkEvent::RadioDown => debug!("Orchestrator: radio down"),
            LinkEvent::BrokerUp => debug!("Orchestrator: broker up"),
            LinkEvent::BrokerDown => debug!("Orchestrator: broker down"),
            LinkEvent::TimeSynced => debug!("Orchestrator: time synced"),
            LinkEvent::Message(msg) => self.route_message(&msg, device, sink),
        }
    }

    /// Warn once per falling edge of a link.
    fn report_link_loss(&self, links: &LinkSnapshot, sink: &mut impl EventSink) {
        if self.ctx.links.radio_connected && !links.radio_connected {
            warn!("Orchestrator: radio link lost in {:?}", self.fsm.current_phase());
            sink.emit(&AppEvent::LinkLost(LinkKind::Radio));
        }
        if self.ctx.links.broker_connected && !links.broker_connected {
            warn!("Orchestrator: broker link lost in {:?}", self.fsm.current_phase());
            sink.emit(&AppEvent::LinkLost(LinkKind::Broker));
        }
    }

    fn route_message<D: DeviceServices>(
        &mut self,
        msg: &InboundMessage,
        device: &mut D,
        sink: &mut impl EventSink,
    ) {
        let topic = msg.topic.as_str();
        debug!("Orchestrator: {} bytes on {}", msg.payload.len(), topic);

        if topics::is_rpc_request(topic) {
            match self.dispatcher.dispatch(topic, &msg.payload, device) {
                DispatchOutcome::Respond { method, response } => {
                    if let Err(e) = self.message.publish(&response.topic, &response.body) {
                        error!("Orchestrator: RPC response to {} failed: {}", response.topic, e);
                    }
                    if let Some(method) = method {
                        sink.emit(&AppEvent::RpcCompleted {
                            method,
                            success: response.success,
                        });
                    }
                }
                DispatchOutcome::Dropped(reason) => {
                    debug!("Orchestrator: request dropped ({:?})", reason);
                    sink.emit(&AppEvent::MessageDropped);
                }
            }
        } else if topics::is_attributes(topic) {
            Self::handle_attributes(&msg.payload);
        } else {
            warn!("Orchestrator: message on unknown topic {}", topic);
            sink.emit(&AppEvent::MessageDropped);
        }
    }

    /// Shared-attribute updates are acknowledged in the log only.
    fn handle_attributes(payload: &[u8]) {
        match serde_json::from_slice::<Value>(payload) {
            Ok(Value::Object(map)) => {
                for key in map.keys() {
                    info!("Orchestrator: attribute '{}' updated", key);
                }
            }
            Ok(_) => warn!("Orchestrator: attribute payload is not an object"),
            Err(e) => error!("Orchestrator: invalid attribute JSON: {}", e),
        }
    }

    fn apply_requests<D: DeviceServices>(&mut self, device: &mut D, sink: &mut impl EventSink) {
        let req = self.ctx.requests;

        if req.connect_radio {
            self.radio.start();
        }

        if req.request_time_sync {
            let timezone = device.timezone();
            if let Err(e) = self.time.request_sync(&timezone) {
                error!("Orchestrator: time sync request failed: {}", e);
            }
        }

        if req.connect_broker {
            self.message.start();
        }

        if req.subscribe {
            self.message.attach_inbox(self.inbox);
            for topic in [RPC_REQUEST_TOPIC, ATTRIBUTES_TOPIC] {
                match self.message.subscribe(topic) {
                    Ok(()) => info!("Orchestrator: subscribed to {}", topic),
                    Err(e) => error!("Orchestrator: subscribe to {} failed: {}", topic, e),
                }
            }
        }

        if req.publish_telemetry {
            self.publish_telemetry(device, sink);
        }
    }

    fn publish_telemetry<D: DeviceServices>(&mut self, device: &D, sink: &mut impl EventSink) {
        let data = TelemetryData {
            temperature: device.temperature_c(),
            tds: device.tds_ppm(),
        };
        let result = data
            .to_json()
            .map_err(|e| {
                error!("Orchestrator: telemetry not encodable: {}", e);
                LinkError::PublishFailed
            })
            .and_then(|body| self.message.publish(TELEMETRY_TOPIC, &body));

        match result {
            Ok(()) => sink.emit(&AppEvent::Telemetry(data)),
            Err(e) => {
                warn!("Orchestrator: telemetry publish failed: {}", e);
                sink.emit(&AppEvent::TelemetryFailed(e));
            }
        }
    }
}

impl<R, M, T> ConnectivityStatus for Orchestrator<R, M, T>
where
    R: RadioLink,
    M: MessageLink,
    T: TimeSync,
{
    fn phase(&self) -> ConnectionPhase {
        self.fsm.current_phase()
    }

    fn is_radio_connected(&self) -> bool {
        self.ctx.links.radio_connected
    }

    fn is_broker_connected(&self) -> bool {
        self.ctx.links.broker_connected
    }
}
