//! EEPROM-backed configuration store.
//!
//! Holds the single in-memory [`ConfigDocument`] and mirrors it to a
//! [`ByteStore`] as NUL-terminated compact JSON at address 0.
//!
//! ```text
//!   set::<F>(v) ──▶ equal? ──yes──▶ Ok (no I/O)
//!                     │
//!                     no
//!                     ▼
//!              cache = v ──▶ serialize ──▶ len check ──▶ write_bytes(0, ..)
//! ```
//!
//! The cache is updated before the write and is not rolled back when the
//! write fails: an `Err` from a setter means "live in memory, not durable".

pub mod document;

use log::{error, info, warn};

use crate::app::ports::{ByteStore, ScheduleStore, TemperatureLimitStore, TimezoneStore};
use crate::error::ConfigError;

use document::{
    ConfigDocument, FeedingSchedule, FeedingScheduleEntry, Field, MAX_SCHEDULE_ENTRIES,
    TemperatureLimits, Timezone,
};

/// Byte address of the document.
pub const CONFIG_ADDRESS: u16 = 0;
/// Persistence buffer size, NUL terminator included.
pub const MAX_CONFIG_SIZE: usize = 512;

/// First byte of an erased EEPROM.
const ERASED_BYTE: u8 = 0xFF;

/// How [`ConfigStore::init`] obtained its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A stored document was parsed.
    Loaded,
    /// Defaults were installed; `persisted` reports whether writing them back succeeded.
    Defaulted { reason: LoadFailure, persisted: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailure {
    /// Read error from the byte store.
    Io,
    /// Erased or zeroed memory.
    Empty,
    /// No terminator or not a valid document.
    Corrupt,
}

pub struct ConfigStore<B> {
    bytes: B,
    doc: ConfigDocument,
}

impl<B: ByteStore> ConfigStore<B> {
    /// A store holding defaults.  Call [`init`](Self::init) before use.
    pub fn new(bytes: B) -> Self {
        Self {
            bytes,
            doc: ConfigDocument::default(),
        }
    }

    /// Load the stored document, or install and persist defaults.
    ///
    /// Never fails: the cache is always fully defined afterwards.
    pub fn init(&mut self) -> LoadOutcome {
        match self.load() {
            Ok(doc) => {
                self.doc = doc;
                info!(
                    "ConfigStore: loaded (tz={}, {} schedule entries)",
                    self.doc.timezone,
                    self.doc.feeding_schedule.len()
                );
                LoadOutcome::Loaded
            }
            Err(reason) => {
                warn!("ConfigStore: load failed ({:?}), using defaults", reason);
                self.doc = ConfigDocument::default();
                let persisted = match self.persist() {
                    Ok(()) => true,
                    Err(e) => {
                        error!("ConfigStore: could not persist defaults: {}", e);
                        false
                    }
                };
                LoadOutcome::Defaulted { reason, persisted }
            }
        }
    }

    // ── Typed field access ────────────────────────────────────

    pub fn get<F: Field>(&self) -> F::Value {
        F::get(&self.doc).clone()
    }

    /// Change-gated write of one field.
    pub fn set<F: Field>(&mut self, value: F::Value) -> Result<(), ConfigError> {
        if *F::get(&self.doc) == value {
            return Ok(());
        }
        *F::get_mut(&mut self.doc) = value;
        info!("ConfigStore: '{}' changed", F::ID.key());
        self.persist()
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.doc
    }

    // ── Composite setters ─────────────────────────────────────

    /// Apply all four limit fields with a single write.  Bounds are
    /// stored at 0.1 °C resolution.
    pub fn set_temperature_limits(&mut self, limits: TemperatureLimits) -> Result<(), ConfigError> {
        let limits = limits.rounded();
        if !limits.is_valid() {
            return Err(ConfigError::InvalidValue("temperature limits"));
        }
        if self.doc.temperature_limits() == limits {
            return Ok(());
        }
        self.doc.temp_min = limits.min_c;
        self.doc.temp_min_enabled = limits.min_enabled;
        self.doc.temp_max = limits.max_c;
        self.doc.temp_max_enabled = limits.max_enabled;
        info!(
            "ConfigStore: limits min={:.1}({}) max={:.1}({})",
            limits.min_c, limits.min_enabled, limits.max_c, limits.max_enabled
        );
        self.persist()
    }

    pub fn set_timezone(&mut self, timezone: &str) -> Result<(), ConfigError> {
        if !document::is_valid_timezone(timezone) {
            return Err(ConfigError::InvalidValue("timezone must be 1-32 printable characters"));
        }
        let tz = Timezone::try_from(timezone)
            .map_err(|()| ConfigError::InvalidValue("timezone longer than 32 bytes"))?;
        self.set::<document::TimezoneField>(tz)
    }

    // ── Feeding schedule ──────────────────────────────────────

    /// Overwrite the entry with the same `slot_id`, else append.
    /// A full schedule fails with [`ConfigError::ScheduleFull`] and is left untouched.
    pub fn upsert_schedule_entry(&mut self, entry: FeedingScheduleEntry) -> Result<(), ConfigError> {
        let schedule = &mut self.doc.feeding_schedule;
        if let Some(existing) = schedule.iter_mut().find(|e| e.slot_id == entry.slot_id) {
            if *existing == entry {
                return Ok(());
            }
            *existing = entry;
        } else if schedule.push(entry).is_err() {
            warn!(
                "ConfigStore: schedule full ({} entries), slot {} rejected",
                MAX_SCHEDULE_ENTRIES, entry.slot_id
            );
            return Err(ConfigError::ScheduleFull);
        }
        info!(
            "ConfigStore: slot {} = {:02}:{:02} x{} ({})",
            entry.slot_id,
            entry.minute_of_day / 60,
            entry.minute_of_day % 60,
            entry.dose,
            if entry.enabled { "on" } else { "off" }
        );
        self.persist()
    }

    /// Remove by `slot_id`.  Removing an absent slot succeeds without I/O.
    pub fn remove_schedule_entry(&mut self, slot_id: u8) -> Result<(), ConfigError> {
        let schedule = &mut self.doc.feeding_schedule;
        let Some(pos) = schedule.iter().position(|e| e.slot_id == slot_id) else {
            return Ok(());
        };
        schedule.remove(pos);
        info!("ConfigStore: slot {} removed", slot_id);
        self.persist()
    }

    /// Borrow the underlying byte store (diagnostics and tests).
    pub fn byte_store(&self) -> &B {
        &self.bytes
    }

    pub fn byte_store_mut(&mut self) -> &mut B {
        &mut self.bytes
    }

    // ── Persistence ───────────────────────────────────────────

    fn persist(&mut self) -> Result<(), ConfigError> {
        let frame = encode(&self.doc)?;
        self.bytes
            .write_bytes(CONFIG_ADDRESS, &frame)
            .inspect_err(|e| error!("ConfigStore: write failed: {}", e))?;
        Ok(())
    }

    fn load(&mut self) -> Result<ConfigDocument, LoadFailure> {
        let len = MAX_CONFIG_SIZE.min(self.bytes.capacity());
        let mut buf = [0u8; MAX_CONFIG_SIZE];
        self.bytes
            .read_bytes(CONFIG_ADDRESS, &mut buf[..len])
            .map_err(|_| LoadFailure::Io)?;
        decode(&buf[..len])
    }
}

/// Serialize `doc` into a NUL-terminated frame that fits [`MAX_CONFIG_SIZE`].
pub fn encode(doc: &ConfigDocument) -> Result<heapless::Vec<u8, MAX_CONFIG_SIZE>, ConfigError> {
    let json = serde_json::to_vec(doc).map_err(|_| ConfigError::Serialize)?;
    if json.len() >= MAX_CONFIG_SIZE {
        return Err(ConfigError::DocumentTooLarge {
            len: json.len() + 1,
            max: MAX_CONFIG_SIZE,
        });
    }
    let mut frame = heapless::Vec::new();
    // Length checked above; both pushes fit.
    let _ = frame.extend_from_slice(&json);
    let _ = frame.push(0);
    Ok(frame)
}

/// Parse a frame read from address 0.  Well-formed JSON whose values
/// are out of range, or whose slot ids repeat, is `Corrupt` as well.
pub fn decode(raw: &[u8]) -> Result<ConfigDocument, LoadFailure> {
    match raw.first() {
        None | Some(&(ERASED_BYTE | 0)) => return Err(LoadFailure::Empty),
        Some(_) => {}
    }
    let end = raw.iter().position(|&b| b == 0).ok_or(LoadFailure::Corrupt)?;
    let doc: ConfigDocument =
        serde_json::from_slice(&raw[..end]).map_err(|_| LoadFailure::Corrupt)?;
    if !doc.is_valid() {
        warn!("ConfigStore: stored document has out-of-range values");
        return Err(LoadFailure::Corrupt);
    }
    Ok(doc)
}

// ── Capability trait impls ────────────────────────────────────

impl<B: ByteStore> ScheduleStore for ConfigStore<B> {
    fn schedule(&self) -> FeedingSchedule {
        self.doc.feeding_schedule.clone()
    }

    fn upsert_schedule_entry(&mut self, entry: FeedingScheduleEntry) -> Result<(), ConfigError> {
        ConfigStore::upsert_schedule_entry(self, entry)
    }

    fn remove_schedule_entry(&mut self, slot_id: u8) -> Result<(), ConfigError> {
        ConfigStore::remove_schedule_entry(self, slot_id)
    }
}

impl<B: ByteStore> TemperatureLimitStore for ConfigStore<B> {
    fn temperature_limits(&self) -> TemperatureLimits {
        self.doc.temperature_limits()
    }

    fn set_temperature_limits(&mut self, limits: TemperatureLimits) -> Result<(), ConfigError> {
        ConfigStore::set_temperature_limits(self, limits)
    }
}

impl<B: ByteStore> TimezoneStore for ConfigStore<B> {
    fn timezone(&self) -> Timezone {
        self.doc.timezone.clone()
    }

    fn set_timezone(&mut self, timezone: &str) -> Result<(), ConfigError> {
        ConfigStore::set_timezone(self, timezone)
    }
}
