//! Link event queue.
//!
//! Driver callbacks (WiFi events, MQTT client callbacks, the SNTP
//! completion hook) run on ESP-IDF tasks, not on the tick loop.  They
//! must not touch orchestrator or dispatcher state, so they push a small
//! [`LinkEvent`] here and return.  The orchestrator drains the queue once
//! per tick.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ WiFi events  │────▶│              │     │              │
//! │ MQTT client  │────▶│  EventQueue  │────▶│ Orchestrator │
//! │ SNTP notify  │────▶│  (bounded)   │     │  (consumer)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::topics::Topic;

/// Maximum number of pending events.
pub const EVENT_QUEUE_DEPTH: usize = 8;

/// Largest inbound payload copied into the queue.
pub const MAX_PAYLOAD_LEN: usize = 512;

/// A raw message received from the broker, not yet parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: Topic,
    pub payload: heapless::Vec<u8, MAX_PAYLOAD_LEN>,
}

impl InboundMessage {
    /// Copy `topic` and `payload` into a bounded message.
    /// Returns `None` when either does not fit.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        let topic = Topic::try_from(topic).ok()?;
        let payload = heapless::Vec::from_slice(payload).ok()?;
        Some(Self { topic, payload })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    // ── Radio ─────────────────────────────────────────────
    RadioUp,
    RadioDown,

    // ── Broker ────────────────────────────────────────────
    BrokerUp,
    BrokerDown,
    Message(InboundMessage),

    // ── Time ──────────────────────────────────────────────
    TimeSynced,
}

/// Bounded multi-producer, single-consumer event queue.
///
/// Never blocks: a full queue drops the new event.
pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, LinkEvent, EVENT_QUEUE_DEPTH>,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Push an event.  Safe to call from any task.
    /// Returns `false` if the queue is full (event dropped).
    pub fn push(&self, event: LinkEvent) -> bool {
        match self.channel.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                warn!("EventQueue: full, dropping event");
                false
            }
        }
    }

    /// Pop the next event, FIFO.  Returns `None` if empty.
    pub fn pop(&self) -> Option<LinkEvent> {
        self.channel.try_receive().ok()
    }

    /// Drain all pending events into a callback.
    pub fn drain(&self, mut handler: impl FnMut(LinkEvent)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
