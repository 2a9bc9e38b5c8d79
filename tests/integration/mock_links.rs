//! Mock adapters for integration tests.
//!
//! Every mock records the calls it receives so tests can assert on the
//! full history without a radio, broker or EEPROM.

use aquaguard::app::events::AppEvent;
use aquaguard::app::orchestrator::Orchestrator;
use aquaguard::app::ports::{
    EventSink, FeederPort, MessageLink, RadioLink, ScheduleStore, TemperatureLimitStore,
    TemperatureProvider, TimeSync, TimezoneStore,
};
use aquaguard::error::{ConfigError, FeederError, LinkError, TimeSyncError};
use aquaguard::events::{EventQueue, InboundMessage, LinkEvent};
use aquaguard::fsm::ConnectionPhase;
use aquaguard::rpc::handlers::builtin_dispatcher;
use aquaguard::store::document::{
    ConfigDocument, FeedingSchedule, FeedingScheduleEntry, TemperatureLimits, Timezone,
};

// ── Radio ─────────────────────────────────────────────────────

/// Radio that associates on `start()` unless told otherwise.
pub struct MockRadio {
    pub starts: u32,
    pub updates: u32,
    pub connected: bool,
    pub connect_on_start: bool,
}

impl Default for MockRadio {
    fn default() -> Self {
        Self {
            starts: 0,
            updates: 0,
            connected: false,
            connect_on_start: true,
        }
    }
}

impl RadioLink for MockRadio {
    fn start(&mut self) {
        self.starts += 1;
        if self.connect_on_start {
            self.connected = true;
        }
    }

    fn update(&mut self) {
        self.updates += 1;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ── Broker ────────────────────────────────────────────────────

pub struct MockBroker {
    pub starts: u32,
    pub connected: bool,
    pub connect_on_start: bool,
    pub fail_publish: bool,
    pub published: Vec<(String, Vec<u8>)>,
    pub subscriptions: Vec<String>,
    pub inbox_attached: bool,
}

impl Default for MockBroker {
    fn default() -> Self {
        Self {
            starts: 0,
            connected: false,
            connect_on_start: true,
            fail_publish: false,
            published: Vec::new(),
            subscriptions: Vec::new(),
            inbox_attached: false,
        }
    }
}

#[allow(dead_code)]
impl MockBroker {
    /// Bodies published on `topic`, oldest first.
    pub fn published_on(&self, topic: &str) -> Vec<String> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, body)| String::from_utf8_lossy(body).into_owned())
            .collect()
    }
}

impl MessageLink for MockBroker {
    fn start(&mut self) {
        self.starts += 1;
        if self.connect_on_start {
            self.connected = true;
        }
    }

    fn update(&mut self) {}

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        if self.fail_publish {
            return Err(LinkError::PublishFailed);
        }
        self.published.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::NotConnected);
        }
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn attach_inbox(&mut self, _inbox: &'static EventQueue) {
        self.inbox_attached = true;
    }
}

// ── Time source ───────────────────────────────────────────────

pub struct MockClock {
    pub requests: Vec<String>,
    pub synced: bool,
    pub sync_on_request: bool,
}

impl Default for MockClock {
    fn default() -> Self {
        Self {
            requests: Vec::new(),
            synced: false,
            sync_on_request: true,
        }
    }
}

impl TimeSync for MockClock {
    fn request_sync(&mut self, timezone: &str) -> Result<(), TimeSyncError> {
        self.requests.push(timezone.to_string());
        if self.sync_on_request {
            self.synced = true;
        }
        Ok(())
    }

    fn is_synced(&self) -> bool {
        self.synced
    }
}

// ── Device services ───────────────────────────────────────────

/// In-memory device: document, feeder and readings in one struct.
pub struct MockDevice {
    pub doc: ConfigDocument,
    pub feeder_busy: bool,
    pub feed_runs: Vec<u8>,
    pub temperature: f32,
    pub tds: i32,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self {
            doc: ConfigDocument::default(),
            feeder_busy: false,
            feed_runs: Vec::new(),
            temperature: 24.5,
            tds: 180,
        }
    }
}

impl ScheduleStore for MockDevice {
    fn schedule(&self) -> FeedingSchedule {
        self.doc.feeding_schedule.clone()
    }

    fn upsert_schedule_entry(&mut self, entry: FeedingScheduleEntry) -> Result<(), ConfigError> {
        let schedule = &mut self.doc.feeding_schedule;
        if let Some(existing) = schedule.iter_mut().find(|e| e.slot_id == entry.slot_id) {
            *existing = entry;
            return Ok(());
        }
        schedule.push(entry).map_err(|_| ConfigError::ScheduleFull)
    }

    fn remove_schedule_entry(&mut self, slot_id: u8) -> Result<(), ConfigError> {
        self.doc.feeding_schedule.retain(|e| e.slot_id != slot_id);
        Ok(())
    }
}

impl TemperatureLimitStore for MockDevice {
    fn temperature_limits(&self) -> TemperatureLimits {
        self.doc.temperature_limits()
    }

    fn set_temperature_limits(&mut self, limits: TemperatureLimits) -> Result<(), ConfigError> {
        self.doc.temp_min = limits.min_c;
        self.doc.temp_min_enabled = limits.min_enabled;
        self.doc.temp_max = limits.max_c;
        self.doc.temp_max_enabled = limits.max_enabled;
        Ok(())
    }
}

impl TimezoneStore for MockDevice {
    fn timezone(&self) -> Timezone {
        self.doc.timezone.clone()
    }

    fn set_timezone(&mut self, timezone: &str) -> Result<(), ConfigError> {
        self.doc.timezone =
            Timezone::try_from(timezone).map_err(|()| ConfigError::InvalidValue("timezone"))?;
        Ok(())
    }
}

impl FeederPort for MockDevice {
    fn is_busy(&self) -> bool {
        self.feeder_busy
    }

    fn start_feeding(&mut self, dose: u8) -> Result<(), FeederError> {
        if self.feeder_busy {
            return Err(FeederError::Busy);
        }
        self.feed_runs.push(dose);
        Ok(())
    }
}

impl TemperatureProvider for MockDevice {
    fn temperature_c(&self) -> f32 {
        self.temperature
    }

    fn tds_ppm(&self) -> i32 {
        self.tds
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn phase_changes(&self) -> Vec<(ConnectionPhase, ConnectionPhase)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::PhaseChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

pub type MockOrchestrator = Orchestrator<MockRadio, MockBroker, MockClock>;

/// Telemetry period used by every harness.
pub const TELEMETRY_MS: u32 = 1_000;
/// Simulated tick length.
pub const TICK_MS: u64 = 50;

/// Ticks from `start()` to `Idle` when every link comes up immediately.
pub const BRING_UP_TICKS: usize = 8;

pub struct Harness {
    pub orch: MockOrchestrator,
    pub device: MockDevice,
    pub sink: RecordingSink,
    pub inbox: &'static EventQueue,
    pub now_ms: u64,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_links(MockRadio::default(), MockBroker::default(), MockClock::default())
    }

    pub fn with_links(radio: MockRadio, broker: MockBroker, clock: MockClock) -> Self {
        let inbox: &'static EventQueue = Box::leak(Box::new(EventQueue::new()));
        let dispatcher = builtin_dispatcher().expect("built-in methods are unique");
        let mut orch = Orchestrator::new(radio, broker, clock, dispatcher, inbox, TELEMETRY_MS);
        let mut sink = RecordingSink::default();
        orch.start(&mut sink);
        Self {
            orch,
            device: MockDevice::default(),
            sink,
            inbox,
            now_ms: 0,
        }
    }

    /// A harness already in `Idle`.
    pub fn online() -> Self {
        let mut h = Self::new();
        h.tick_n(BRING_UP_TICKS);
        assert_eq!(h.phase(), ConnectionPhase::Idle, "bring-up did not reach Idle");
        h
    }

    pub fn tick(&mut self) {
        self.now_ms += TICK_MS;
        self.orch.update(self.now_ms, &mut self.device, &mut self.sink);
    }

    pub fn tick_n(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Advance time to `ms` after the current instant, ticking along the way.
    pub fn run_for(&mut self, ms: u64) {
        let until = self.now_ms + ms;
        while self.now_ms < until {
            self.tick();
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        use aquaguard::app::ports::ConnectivityStatus;
        self.orch.phase()
    }

    /// Queue a broker message as the MQTT callback would.
    pub fn deliver(&self, topic: &str, payload: &[u8]) {
        let msg = InboundMessage::new(topic, payload).expect("message fits the inbox");
        assert!(self.inbox.push(LinkEvent::Message(msg)));
    }

    pub fn broker(&self) -> &MockBroker {
        self.orch.message_link()
    }

    pub fn broker_mut(&mut self) -> &mut MockBroker {
        self.orch.message_link_mut()
    }
}
