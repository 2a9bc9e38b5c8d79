//! SNTP time source.
//!
//! Implements [`TimeSync`].  `request_sync` applies the device timezone
//! to the C runtime, then starts the SNTP client exactly once.  The
//! completion callback sets a flag and pushes `LinkEvent::TimeSynced`.
//!
//! Off-target builds complete immediately unless a [`SimClock`] handle
//! holds the sync back.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use crate::app::ports::TimeSync;
use crate::error::TimeSyncError;
use crate::store::document::is_valid_timezone;

/// Apply a POSIX TZ string (e.g. `CET-1CEST,M3.5.0,M10.5.0/3`) to the
/// process-wide local time conversion.
#[cfg(target_os = "espidf")]
pub fn apply_posix_timezone(timezone: &str) -> Result<(), TimeSyncError> {
    if !is_valid_timezone(timezone) {
        return Err(TimeSyncError::InvalidTimezone);
    }
    // SAFETY: the tick loop is the only writer of TZ and no other task
    // reads the environment concurrently.
    unsafe {
        std::env::set_var("TZ", timezone);
        esp_idf_svc::sys::tzset();
    }
    info!("SNTP: timezone set to '{}'", timezone);
    Ok(())
}

/// Apply a POSIX TZ string.  The host build only validates and logs it.
#[cfg(not(target_os = "espidf"))]
pub fn apply_posix_timezone(timezone: &str) -> Result<(), TimeSyncError> {
    if !is_valid_timezone(timezone) {
        return Err(TimeSyncError::InvalidTimezone);
    }
    info!("SNTP(sim): timezone set to '{}'", timezone);
    Ok(())
}

pub struct SntpClock {
    synced: Arc<AtomicBool>,
    requested: bool,
    ntp_server: heapless::String<64>,
    #[cfg(target_os = "espidf")]
    events: &'static crate::events::EventQueue,
    #[cfg(target_os = "espidf")]
    sntp: Option<esp_idf_svc::sntp::EspSntp<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimClock,
}

impl SntpClock {
    pub fn ntp_server(&self) -> &str {
        &self.ntp_server
    }

    /// Whether the SNTP client has been started.
    pub fn is_requested(&self) -> bool {
        self.requested
    }
}

impl TimeSync for SntpClock {
    fn request_sync(&mut self, timezone: &str) -> Result<(), TimeSyncError> {
        apply_posix_timezone(timezone)?;
        if self.requested {
            return Ok(());
        }
        self.platform_start()?;
        self.requested = true;
        Ok(())
    }

    fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF backend
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl SntpClock {
    pub fn new(ntp_server: &str, events: &'static crate::events::EventQueue) -> Self {
        Self {
            synced: Arc::new(AtomicBool::new(false)),
            requested: false,
            ntp_server: heapless::String::try_from(ntp_server).unwrap_or_default(),
            events,
            sntp: None,
        }
    }

    fn platform_start(&mut self) -> Result<(), TimeSyncError> {
        use esp_idf_svc::sntp::{EspSntp, SntpConf};

        use crate::events::LinkEvent;

        let mut conf = SntpConf::default();
        if !self.ntp_server.is_empty() {
            conf.servers[0] = self.ntp_server.as_str();
        }

        let synced = self.synced.clone();
        let events = self.events;
        let sntp = EspSntp::new_with_callback(&conf, move |_now| {
            synced.store(true, Ordering::Release);
            events.push(LinkEvent::TimeSynced);
        })
        .map_err(|e| {
            warn!("SNTP: client start failed: {}", e);
            TimeSyncError::Driver
        })?;

        self.sntp = Some(sntp);
        info!("SNTP: sync with {} requested", self.ntp_server);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation backend
// ───────────────────────────────────────────────────────────────

/// Test handle for the simulated time source.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    synced: Arc<AtomicBool>,
    hold: Arc<AtomicBool>,
    fail: Arc<AtomicBool>,
}

#[cfg(not(target_os = "espidf"))]
impl SimClock {
    /// Keep a started sync pending until [`complete`](Self::complete).
    pub fn hold(&self, hold: bool) {
        self.hold.store(hold, Ordering::Relaxed);
    }

    /// Make the client fail to start.
    pub fn fail_start(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    /// Deliver the server reply.
    pub fn complete(&self) {
        self.synced.store(true, Ordering::Release);
    }
}

#[cfg(not(target_os = "espidf"))]
impl SntpClock {
    /// A simulated clock plus the handle that controls it.
    pub fn simulated(ntp_server: &str) -> (Self, SimClock) {
        let sim = SimClock::default();
        let clock = Self {
            synced: sim.synced.clone(),
            requested: false,
            ntp_server: heapless::String::try_from(ntp_server).unwrap_or_default(),
            sim: sim.clone(),
        };
        (clock, sim)
    }

    fn platform_start(&mut self) -> Result<(), TimeSyncError> {
        if self.sim.fail.load(Ordering::Relaxed) {
            warn!("SNTP(sim): client start failed");
            return Err(TimeSyncError::Driver);
        }
        if !self.sim.hold.load(Ordering::Relaxed) {
            self.sim.complete();
        }
        info!("SNTP(sim): sync with {} requested", self.ntp_server);
        Ok(())
    }
}
