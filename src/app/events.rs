//! Outbound application events.
//!
//! The [`Orchestrator`](super::orchestrator::Orchestrator) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: log to serial, refresh
//! the display, etc.

use serde::Serialize;

use crate::error::LinkError;
use crate::fsm::ConnectionPhase;

/// Structured events emitted by the connectivity core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The orchestrator has started (carries initial phase).
    Started(ConnectionPhase),

    /// The phase machine moved between phases.
    PhaseChanged {
        from: ConnectionPhase,
        to: ConnectionPhase,
    },

    /// A transport link dropped.
    LinkLost(LinkKind),

    /// A telemetry document was published.
    Telemetry(TelemetryData),

    /// Publishing telemetry failed; the phase machine carries on.
    TelemetryFailed(LinkError),

    /// An RPC request was answered.
    RpcCompleted { method: RpcMethod, success: bool },

    /// An inbound message was dropped without a response.
    MessageDropped,
}

/// Which transport link an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Radio,
    Broker,
}

/// Method name of an answered RPC, bounded for the event queue.
pub type RpcMethod = heapless::String<32>;

/// The periodic telemetry document: `{"temperature": 24.5, "tds": 180}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryData {
    pub temperature: f32,
    pub tds: i32,
}

impl TelemetryData {
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
