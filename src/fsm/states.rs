//! Concrete phase handler functions and table builder.
//!
//! Each phase is three plain `fn` pointers; no closures, no dynamic
//! dispatch, no heap.  `Start*` phases write one request into the
//! context and move on; `Await*` phases poll the link snapshot.
//!
//! ```text
//!  INIT ─▶ START_RADIO ─▶ AWAIT_RADIO ──[radio up]──▶ START_TIME_SYNC
//!                                                          │
//!        SUBSCRIBE ◀──[broker up]── AWAIT_LINK ◀── START_LINK ◀──[synced]── AWAIT_TIME_SYNC
//!            │
//!            ▼
//!          IDLE ──[timer elapsed]──▶ SEND_TELEMETRY
//!            ▲                              │
//!            └──────────────────────────────┘
//!
//!  IDLE ──[radio or broker lost]──▶ FAULT   (terminal until reset)
//!
//!  AWAIT_RADIO / AWAIT_LINK re-request their connect every
//!  CONNECT_RETRY_TICKS ticks.
//! ```

use super::context::PhaseContext;
use super::{ConnectionPhase, PhaseDescriptor};
use log::{debug, info, warn};

/// While a link is awaited, its connect request is re-issued this often.
/// `start()` is a no-op on a link that is still connecting, so only a
/// link whose attempt failed actually reconnects.
pub const CONNECT_RETRY_TICKS: u64 = 100;

fn retry_due(ctx: &PhaseContext) -> bool {
    ctx.ticks_in_phase > 0 && ctx.ticks_in_phase % CONNECT_RETRY_TICKS == 0
}

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static phase table.  Called once at startup.
pub fn build_phase_table() -> [PhaseDescriptor; ConnectionPhase::COUNT] {
    [
        PhaseDescriptor {
            phase: ConnectionPhase::Init,
            name: "Init",
            on_enter: Some(init_enter),
            on_exit: None,
            on_update: init_update,
        },
        PhaseDescriptor {
            phase: ConnectionPhase::StartRadio,
            name: "StartRadio",
            on_enter: None,
            on_exit: None,
            on_update: start_radio_update,
        },
        PhaseDescriptor {
            phase: ConnectionPhase::AwaitRadio,
            name: "AwaitRadio",
            on_enter: None,
            on_exit: Some(await_radio_exit),
            on_update: await_radio_update,
        },
        PhaseDescriptor {
            phase: ConnectionPhase::StartTimeSync,
            name: "StartTimeSync",
            on_enter: None,
            on_exit: None,
            on_update: start_time_sync_update,
        },
        PhaseDescriptor {
            phase: ConnectionPhase::AwaitTimeSync,
            name: "AwaitTimeSync",
            on_enter: None,
            on_exit: Some(await_time_sync_exit),
            on_update: await_time_sync_update,
        },
        PhaseDescriptor {
            phase: ConnectionPhase::StartMessageLink,
            name: "StartMessageLink",
            on_enter: None,
            on_exit: None,
            on_update: start_message_link_update,
        },
        PhaseDescriptor {
            phase: ConnectionPhase::AwaitMessageLink,
            name: "AwaitMessageLink",
            on_enter: None,
            on_exit: Some(await_message_link_exit),
            on_update: await_message_link_update,
        },
        PhaseDescriptor {
            phase: ConnectionPhase::SubscribeTopics,
            name: "SubscribeTopics",
            on_enter: None,
            on_exit: None,
            on_update: subscribe_topics_update,
        },
        PhaseDescriptor {
            phase: ConnectionPhase::Idle,
            name: "Idle",
            on_enter: None,
            on_exit: None,
            on_update: idle_update,
        },
        PhaseDescriptor {
            phase: ConnectionPhase::SendTelemetry,
            name: "SendTelemetry",
            on_enter: None,
            on_exit: None,
            on_update: send_telemetry_update,
        },
        PhaseDescriptor {
            phase: ConnectionPhase::Fault,
            name: "Fault",
            on_enter: Some(fault_enter),
            on_exit: Some(fault_exit),
            on_update: fault_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  INIT
// ═══════════════════════════════════════════════════════════════════════════

fn init_enter(ctx: &mut PhaseContext) {
    ctx.telemetry_timer.stop();
    info!("INIT: starting link bring-up");
}

fn init_update(_ctx: &mut PhaseContext) -> Option<ConnectionPhase> {
    Some(ConnectionPhase::StartRadio)
}

// ═══════════════════════════════════════════════════════════════════════════
//  RADIO
// ═══════════════════════════════════════════════════════════════════════════

fn start_radio_update(ctx: &mut PhaseContext) -> Option<ConnectionPhase> {
    ctx.requests.connect_radio = true;
    Some(ConnectionPhase::AwaitRadio)
}

fn await_radio_update(ctx: &mut PhaseContext) -> Option<ConnectionPhase> {
    if ctx.links.radio_connected {
        return Some(ConnectionPhase::StartTimeSync);
    }
    if retry_due(ctx) {
        debug!("RADIO: still waiting, re-requesting connect");
        ctx.requests.connect_radio = true;
    }
    None
}

fn await_radio_exit(ctx: &mut PhaseContext) {
    info!("RADIO: associated after {} ticks", ctx.ticks_in_phase);
}

// ═══════════════════════════════════════════════════════════════════════════
//  TIME SYNC
// ═══════════════════════════════════════════════════════════════════════════

fn start_time_sync_update(ctx: &mut PhaseContext) -> Option<ConnectionPhase> {
    ctx.requests.request_time_sync = true;
    Some(ConnectionPhase::AwaitTimeSync)
}

fn await_time_sync_update(ctx: &mut PhaseContext) -> Option<ConnectionPhase> {
    if ctx.links.time_synced {
        return Some(ConnectionPhase::StartMessageLink);
    }
    None
}

fn await_time_sync_exit(ctx: &mut PhaseContext) {
    info!("TIME: synchronised after {} ticks", ctx.ticks_in_phase);
}

// ═══════════════════════════════════════════════════════════════════════════
//  MESSAGE LINK
// ═══════════════════════════════════════════════════════════════════════════

fn start_message_link_update(ctx: &mut PhaseContext) -> Option<ConnectionPhase> {
    ctx.requests.connect_broker = true;
    Some(ConnectionPhase::AwaitMessageLink)
}

fn await_message_link_update(ctx: &mut PhaseContext) -> Option<ConnectionPhase> {
    if ctx.links.broker_connected {
        return Some(ConnectionPhase::SubscribeTopics);
    }
    if retry_due(ctx) {
        debug!("BROKER: still waiting, re-requesting connect");
        ctx.requests.connect_broker = true;
    }
    None
}

fn await_message_link_exit(ctx: &mut PhaseContext) {
    info!("BROKER: session up after {} ticks", ctx.ticks_in_phase);
}

fn subscribe_topics_update(ctx: &mut PhaseContext) -> Option<ConnectionPhase> {
    ctx.requests.subscribe = true;
    ctx.telemetry_timer.restart(ctx.now_ms);
    Some(ConnectionPhase::Idle)
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE / TELEMETRY
// ═══════════════════════════════════════════════════════════════════════════

fn idle_update(ctx: &mut PhaseContext) -> Option<ConnectionPhase> {
    // Guard: a lost link is reported, never retried here.
    if !ctx.links_up() {
        return Some(ConnectionPhase::Fault);
    }

    if ctx.telemetry_timer.poll(ctx.now_ms) {
        return Some(ConnectionPhase::SendTelemetry);
    }

    None
}

fn send_telemetry_update(ctx: &mut PhaseContext) -> Option<ConnectionPhase> {
    debug!("TELEMETRY: publish requested at {} ms", ctx.now_ms);
    ctx.requests.publish_telemetry = true;
    Some(ConnectionPhase::Idle)
}

// ═══════════════════════════════════════════════════════════════════════════
//  FAULT
// ═══════════════════════════════════════════════════════════════════════════

fn fault_enter(ctx: &mut PhaseContext) {
    ctx.telemetry_timer.stop();
    warn!(
        "FAULT: link lost (radio={}, broker={}); waiting for reset",
        ctx.links.radio_connected, ctx.links.broker_connected
    );
}

fn fault_exit(_ctx: &mut PhaseContext) {
    info!("FAULT: external reset");
}

fn fault_update(_ctx: &mut PhaseContext) -> Option<ConnectionPhase> {
    // No automatic recovery.
    None
}
