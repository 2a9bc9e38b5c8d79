//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).  The display
//! collaborator would implement the same trait.

use log::{info, warn};

use crate::app::events::{AppEvent, LinkKind};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(phase) => {
                info!("START | initial_phase={:?}", phase);
            }
            AppEvent::PhaseChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::LinkLost(kind) => {
                let name = match kind {
                    LinkKind::Radio => "radio",
                    LinkKind::Broker => "broker",
                };
                warn!("LINK | {} lost", name);
            }
            AppEvent::Telemetry(t) => {
                info!("TELEM | T={:.1}\u{00b0}C | TDS={}ppm", t.temperature, t.tds);
            }
            AppEvent::TelemetryFailed(e) => {
                warn!("TELEM | publish failed: {}", e);
            }
            AppEvent::RpcCompleted { method, success } => {
                info!(
                    "RPC | {} -> {}",
                    method,
                    if *success { "success" } else { "error" }
                );
            }
            AppEvent::MessageDropped => {
                info!("RPC | message dropped");
            }
        }
    }
}
