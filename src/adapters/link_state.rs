//! Connection sub-state machine shared by the radio and broker links.
//!
//! ```text
//!   Idle ──start()──▶ Connecting ──[connected flag]──▶ Connected
//!    ▲                    │                               │
//!    │              [failed flag]                   [flag cleared]
//!    │                    ▼                               ▼
//!    └─────────────── Error ◀─────────────────────────────┘
//!                      │
//!                      ├──start()──▶ Connecting
//!                      └──[connected flag]──▶ Connected
//! ```
//!
//! A driver that reconnects on its own (esp-mqtt does) raises the
//! connected flag while the machine sits in `Error`; that is taken as
//! the link coming up.
//!
//! Driver callbacks only touch [`LinkFlags`]; the state itself moves in
//! `update()` on the tick loop.

use core::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Connecting,
    Connected,
    Error,
}

/// Single-word flags written from driver callbacks.
#[derive(Debug, Default)]
pub struct LinkFlags {
    connected: AtomicBool,
    failed: AtomicBool,
}

impl LinkFlags {
    pub const fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            failed: AtomicBool::new(false),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Report a failed connection attempt.
    pub fn set_failed(&self) {
        self.failed.store(true, Ordering::Release);
    }

    fn take_failed(&self) -> bool {
        self.failed.swap(false, Ordering::AcqRel)
    }

    fn clear_failed(&self) {
        self.failed.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct LinkStateMachine {
    name: &'static str,
    state: LinkState,
}

impl LinkStateMachine {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            state: LinkState::Idle,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    /// Enter `Connecting` if idle or in error.  Returns `false` (and does
    /// nothing) from any other state.
    pub fn begin_connect(&mut self, flags: &LinkFlags) -> bool {
        if !matches!(self.state, LinkState::Idle | LinkState::Error) {
            return false;
        }
        flags.clear_failed();
        info!("{}: connecting", self.name);
        self.state = LinkState::Connecting;
        true
    }

    /// The connect request itself was refused by the driver.
    pub fn connect_refused(&mut self) {
        warn!("{}: connect request refused", self.name);
        self.state = LinkState::Error;
    }

    /// Advance from the callback flags.  Returns the new state on change.
    pub fn update(&mut self, flags: &LinkFlags) -> Option<LinkState> {
        let next = match self.state {
            LinkState::Connecting if flags.is_connected() => {
                info!("{}: connected", self.name);
                LinkState::Connected
            }
            LinkState::Error if flags.is_connected() => {
                flags.clear_failed();
                info!("{}: connected after earlier failure", self.name);
                LinkState::Connected
            }
            LinkState::Connecting if flags.take_failed() => {
                warn!("{}: connection attempt failed", self.name);
                LinkState::Error
            }
            LinkState::Connected if !flags.is_connected() => {
                warn!("{}: link lost", self.name);
                LinkState::Error
            }
            _ => return None,
        };
        self.state = next;
        Some(next)
    }
}
