//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Orchestrator / Dispatcher / ConfigStore
//! ```
//!
//! Driven adapters (WiFi, MQTT, SNTP, EEPROM, feeder, sensors) implement
//! these traits.  The core consumes them via generics or narrow trait
//! objects, so it never touches ESP-IDF directly and every piece can be
//! exercised on the host with mocks.
//!
//! ## Execution contexts
//!
//! Every method here is called from the tick loop and must return
//! without sleeping.  Work that completes later (radio association,
//! broker CONNACK, SNTP reply, a feeding run) is observed by polling
//! `is_connected()` / `is_synced()` / `is_busy()` on a later tick.

use crate::error::{ConfigError, FeederError, LinkError, StorageError, TimeSyncError};
use crate::events::EventQueue;
use crate::fsm::ConnectionPhase;
use crate::store::document::{FeedingSchedule, FeedingScheduleEntry, TemperatureLimits, Timezone};

use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Transport links
// ───────────────────────────────────────────────────────────────

/// Station-mode radio link with its own connection sub-state machine.
pub trait RadioLink {
    /// Request a connection.  Only acts when idle or in error.
    fn start(&mut self);

    /// Advance the link's sub-state machine from driver flags.
    fn update(&mut self);

    fn is_connected(&self) -> bool;
}

/// Publish/subscribe broker link.
pub trait MessageLink {
    /// Request a broker session.  Only acts when idle or in error.
    fn start(&mut self);

    /// Advance the link's sub-state machine from driver flags.
    fn update(&mut self);

    fn is_connected(&self) -> bool;

    /// Non-blocking publish.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError>;

    /// Non-blocking subscribe.
    fn subscribe(&mut self, topic: &str) -> Result<(), LinkError>;

    /// Route every received message into `inbox`.  The driver callback
    /// must do nothing else.
    fn attach_inbox(&mut self, inbox: &'static EventQueue);
}

// ───────────────────────────────────────────────────────────────
// Time source
// ───────────────────────────────────────────────────────────────

/// One-shot network time synchronisation.
pub trait TimeSync {
    /// Apply `timezone` and start a sync; completion is reported through
    /// [`is_synced`](Self::is_synced).
    fn request_sync(&mut self, timezone: &str) -> Result<(), TimeSyncError>;

    fn is_synced(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Non-volatile byte store
// ───────────────────────────────────────────────────────────────

/// Byte-addressable non-volatile memory.
///
/// Implementations handle paging internally; callers submit whole
/// buffers.  Accesses past [`capacity`](Self::capacity) fail with
/// [`StorageError::OutOfBounds`] without touching the device.
pub trait ByteStore {
    fn read_bytes(&mut self, address: u16, buf: &mut [u8]) -> Result<(), StorageError>;

    fn write_bytes(&mut self, address: u16, data: &[u8]) -> Result<(), StorageError>;

    fn capacity(&self) -> usize;
}

// ───────────────────────────────────────────────────────────────
// Capability traits (consumed by RPC handlers and telemetry)
// ───────────────────────────────────────────────────────────────

/// Latest water readings for telemetry.
pub trait TemperatureProvider {
    fn temperature_c(&self) -> f32;
    fn tds_ppm(&self) -> i32;
}

/// Feeding schedule persistence.
pub trait ScheduleStore {
    fn schedule(&self) -> FeedingSchedule;

    /// Insert or overwrite the entry with the same `slot_id`.
    fn upsert_schedule_entry(&mut self, entry: FeedingScheduleEntry) -> Result<(), ConfigError>;

    /// Remove by `slot_id`; absent slots are not an error.
    fn remove_schedule_entry(&mut self, slot_id: u8) -> Result<(), ConfigError>;
}

/// Temperature alarm limits.
pub trait TemperatureLimitStore {
    fn temperature_limits(&self) -> TemperatureLimits;
    fn set_temperature_limits(&mut self, limits: TemperatureLimits) -> Result<(), ConfigError>;
}

/// Device timezone (POSIX TZ string).
pub trait TimezoneStore {
    fn timezone(&self) -> Timezone;
    fn set_timezone(&mut self, timezone: &str) -> Result<(), ConfigError>;
}

/// Feeding actuator worker.  At most one run may be active.
pub trait FeederPort {
    fn is_busy(&self) -> bool;

    /// Start a run of `dose` portions on an independent worker and
    /// return immediately.
    fn start_feeding(&mut self, dose: u8) -> Result<(), FeederError>;
}

/// The narrow proxy RPC handlers operate on.
pub trait RpcContext: ScheduleStore + TemperatureLimitStore + TimezoneStore + FeederPort {}

impl<T> RpcContext for T where T: ScheduleStore + TemperatureLimitStore + TimezoneStore + FeederPort {}

/// Everything the orchestrator needs from the rest of the device per tick.
pub trait DeviceServices: RpcContext + TemperatureProvider {}

impl<T> DeviceServices for T where T: RpcContext + TemperatureProvider {}

// ───────────────────────────────────────────────────────────────
// Status & events (driven adapter: domain → display / logging)
// ───────────────────────────────────────────────────────────────

/// Read-only connectivity status for the display.
pub trait ConnectivityStatus {
    fn phase(&self) -> ConnectionPhase;
    fn is_radio_connected(&self) -> bool;
    fn is_broker_connected(&self) -> bool;

    fn is_faulted(&self) -> bool {
        self.phase() == ConnectionPhase::Fault
    }
}

/// The core emits structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}
