//! Shared mutable context threaded through every phase handler.
//!
//! `PhaseContext` is the blackboard phase handlers read from and write
//! to.  The orchestrator fills [`LinkSnapshot`] before each tick and
//! applies [`LinkRequests`] after it, so handlers never touch a driver.

use crate::timer::IntervalTimer;

// ---------------------------------------------------------------------------
// Link snapshot (read-only to handlers; written by the orchestrator)
// ---------------------------------------------------------------------------

/// Point-in-time status of every link the bring-up sequence waits on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub radio_connected: bool,
    pub broker_connected: bool,
    pub time_synced: bool,
}

// ---------------------------------------------------------------------------
// Link requests (written by handlers; consumed by the orchestrator)
// ---------------------------------------------------------------------------

/// Side effects a handler asks for.  Applied once, then cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkRequests {
    pub connect_radio: bool,
    pub request_time_sync: bool,
    pub connect_broker: bool,
    /// Subscribe to the RPC and attribute topics and attach the inbox.
    pub subscribe: bool,
    pub publish_telemetry: bool,
}

impl LinkRequests {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// PhaseContext
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PhaseContext {
    pub links: LinkSnapshot,
    pub requests: LinkRequests,
    /// Monotonic milliseconds at the start of this tick.
    pub now_ms: u64,
    /// Ticks spent in the current phase (set by the engine).
    pub ticks_in_phase: u64,
    /// Telemetry cadence; armed when topics are subscribed.
    pub telemetry_timer: IntervalTimer,
}

impl PhaseContext {
    pub fn new(telemetry_interval_ms: u64) -> Self {
        Self {
            links: LinkSnapshot::default(),
            requests: LinkRequests::default(),
            now_ms: 0,
            ticks_in_phase: 0,
            telemetry_timer: IntervalTimer::new(telemetry_interval_ms),
        }
    }

    /// Both transport links are up.
    pub fn links_up(&self) -> bool {
        self.links.radio_connected && self.links.broker_connected
    }
}
