//! Function-pointer finite state machine engine for link bring-up.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  PhaseTable                                                  │
//! │  ┌──────────────────┬──────────┬──────────┬────────────────┐ │
//! │  │ ConnectionPhase  │ on_enter │ on_exit  │ on_update      │ │
//! │  ├──────────────────┼──────────┼──────────┼────────────────┤ │
//! │  │ Init             │ fn(ctx)  │ -        │ fn(ctx)->Opt<> │ │
//! │  │ StartRadio       │ -        │ -        │ fn(ctx)->Opt<> │ │
//! │  │ ...              │          │          │                │ │
//! │  │ Fault            │ fn(ctx)  │ -        │ fn(ctx)->Opt<> │ │
//! │  └──────────────────┴──────────┴──────────┴────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** phase
//! exactly once.  If it returns `Some(next)`, the engine runs `on_exit`
//! for the current phase, then `on_enter` for the next.  Handlers only
//! read the link snapshot in [`PhaseContext`] and write requests into it;
//! the orchestrator performs the actual I/O afterwards.

pub mod context;
pub mod states;

use context::PhaseContext;
use log::info;

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

/// Connectivity phases, in bring-up order.
/// Must stay in sync with the table built in [`states::build_phase_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionPhase {
    Init = 0,
    StartRadio = 1,
    AwaitRadio = 2,
    StartTimeSync = 3,
    AwaitTimeSync = 4,
    StartMessageLink = 5,
    AwaitMessageLink = 6,
    SubscribeTopics = 7,
    Idle = 8,
    SendTelemetry = 9,
    Fault = 10,
}

impl ConnectionPhase {
    /// Total number of phases; sizes the table array.
    pub const COUNT: usize = 11;

    pub const ALL: [ConnectionPhase; Self::COUNT] = [
        Self::Init,
        Self::StartRadio,
        Self::AwaitRadio,
        Self::StartTimeSync,
        Self::AwaitTimeSync,
        Self::StartMessageLink,
        Self::AwaitMessageLink,
        Self::SubscribeTopics,
        Self::Idle,
        Self::SendTelemetry,
        Self::Fault,
    ];

    /// Convert an index back to a phase.  Out-of-range indices map to
    /// `Fault` (debug builds assert).
    pub fn from_index(idx: usize) -> Self {
        if let Some(phase) = Self::ALL.get(idx) {
            *phase
        } else {
            debug_assert!(false, "invalid phase index: {idx}");
            Self::Fault
        }
    }

    /// `true` once topics are subscribed and the link is serving.
    pub fn is_operational(self) -> bool {
        matches!(self, Self::Idle | Self::SendTelemetry)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type PhaseActionFn = fn(&mut PhaseContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type PhaseUpdateFn = fn(&mut PhaseContext) -> Option<ConnectionPhase>;

/// Static descriptor for a single phase.
pub struct PhaseDescriptor {
    pub phase: ConnectionPhase,
    pub name: &'static str,
    pub on_enter: Option<PhaseActionFn>,
    pub on_exit: Option<PhaseActionFn>,
    pub on_update: PhaseUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `ConnectionPhase as usize`.
    table: [PhaseDescriptor; ConnectionPhase::COUNT],
    current: usize,
    tick_count: u64,
    phase_entry_tick: u64,
}

impl Fsm {
    pub fn new(table: [PhaseDescriptor; ConnectionPhase::COUNT], initial: ConnectionPhase) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            phase_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter`.  Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut PhaseContext) {
        info!("FSM starting in phase: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Run the current phase's `on_update` once and apply any transition.
    pub fn tick(&mut self, ctx: &mut PhaseContext) {
        self.tick_count += 1;
        ctx.ticks_in_phase = self.tick_count - self.phase_entry_tick;

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_phase) = next {
            self.transition(next_phase, ctx);
        }
    }

    /// Jump to `next` regardless of what `on_update` would return.
    pub fn force_transition(&mut self, next: ConnectionPhase, ctx: &mut PhaseContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_phase(&self) -> ConnectionPhase {
        ConnectionPhase::from_index(self.current)
    }

    pub fn ticks_in_current_phase(&self) -> u64 {
        self.tick_count - self.phase_entry_tick
    }

    fn transition(&mut self, next: ConnectionPhase, ctx: &mut PhaseContext) {
        let next_idx = next as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.phase_entry_tick = self.tick_count;
        ctx.ticks_in_phase = 0;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
