//! Aquarium Guardian firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  WifiLink      MqttLink      SntpClock      LogEventSink       │
//! │  (RadioLink)   (MessageLink) (TimeSync)     (EventSink)        │
//! │  At24Eeprom ─▶ ConfigStore ─┐                                  │
//! │  FeederWorker ──────────────┼─▶ GuardianProxy (DeviceServices) │
//! │  SharedReadings ────────────┘                                  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Orchestrator (pure logic)                 │    │
//! │  │  Phase FSM · RPC dispatcher · telemetry timer          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::ledc::config::TimerConfig;
use esp_idf_svc::hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;
use log::{info, warn};

use aquaguard::adapters::eeprom::At24Eeprom;
use aquaguard::adapters::feeder::{FeedTiming, FeederWorker, LedcServo};
use aquaguard::adapters::guardian::GuardianProxy;
use aquaguard::adapters::hardware::SharedReadings;
use aquaguard::adapters::log_sink::LogEventSink;
use aquaguard::adapters::mqtt::MqttLink;
use aquaguard::adapters::sntp::SntpClock;
use aquaguard::adapters::time::MonotonicClock;
use aquaguard::adapters::wifi::WifiLink;
use aquaguard::app::orchestrator::Orchestrator;
use aquaguard::app::ports::ConnectivityStatus;
use aquaguard::config::NetworkConfig;
use aquaguard::error::Error;
use aquaguard::events::EventQueue;
use aquaguard::rpc::handlers::builtin_dispatcher;
use aquaguard::store::{ConfigStore, LoadOutcome};

/// Link callbacks → tick loop.
static INBOX: EventQueue = EventQueue::new();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Aquarium Guardian v{}            ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = NetworkConfig::default();
    if let Err(field) = config.validate() {
        warn!("Network config: {}", field);
    }

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 2. Configuration store (EEPROM on I2C0) ───────────────
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(Hertz(400_000)),
    )?;
    let mut store = ConfigStore::new(At24Eeprom::new(i2c, FreeRtos));
    match store.init() {
        LoadOutcome::Loaded => info!("Config loaded from EEPROM"),
        LoadOutcome::Defaulted { reason, persisted } => {
            warn!("Config defaulted ({:?}), persisted: {}", reason, persisted);
        }
    }

    // ── 3. Feeder servo (LEDC 50 Hz, 14-bit) ──────────────────
    let servo_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig {
            frequency: Hertz(50),
            resolution: Resolution::Bits14,
            ..Default::default()
        },
    )?;
    let servo_channel = LedcDriver::new(peripherals.ledc.channel0, servo_timer, peripherals.pins.gpio18)?;
    let feeder = FeederWorker::new(LedcServo::new(servo_channel), FeedTiming::default());

    // No sensor driver is wired yet, so telemetry reports 0.0 °C and 0 ppm.
    let readings = SharedReadings::new();
    let mut device = GuardianProxy::new(store, feeder, readings);

    // ── 4. Links ──────────────────────────────────────────────
    let wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?;
    let radio = WifiLink::new(
        wifi,
        sysloop,
        config.wifi_ssid.as_str(),
        config.wifi_password.as_str(),
        &INBOX,
    )
    .map_err(Error::from)?;
    let broker = MqttLink::new(&config);
    let clock = SntpClock::new(config.ntp_server.as_str(), &INBOX);

    // ── 5. Orchestrator ───────────────────────────────────────
    let dispatcher = builtin_dispatcher().map_err(Error::from)?;
    let mut orchestrator = Orchestrator::new(
        radio,
        broker,
        clock,
        dispatcher,
        &INBOX,
        config.telemetry_interval_ms,
    );
    let mut sink = LogEventSink::new();
    orchestrator.start(&mut sink);

    info!("System ready. Entering tick loop.");

    // ── 6. Cooperative tick loop ──────────────────────────────
    let uptime = MonotonicClock::new();
    let tick = Duration::from_millis(u64::from(config.tick_interval_ms));
    let mut fault_reported = false;

    loop {
        orchestrator.update(uptime.now_ms(), &mut device, &mut sink);

        // Recovery from Fault is a manual reset.
        if orchestrator.is_faulted() && !fault_reported {
            warn!("Connectivity faulted; waiting for reset");
        }
        fault_reported = orchestrator.is_faulted();

        std::thread::sleep(tick);
    }
}
