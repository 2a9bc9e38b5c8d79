//! Feeding worker.
//!
//! [`FeederWorker`] runs each feeding on its own thread so the tick
//! loop never waits on the servo.  A single `busy` flag guards the
//! worker: it is claimed with a compare-exchange before spawning and
//! cleared by the thread when the last portion is dispensed.
//!
//! ```text
//!  per portion:  open ──hold──▶ close ──settle──▶ next
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{error, info};

use crate::app::ports::FeederPort;
use crate::error::FeederError;

/// Dose bounds accepted by [`FeederPort::start_feeding`], shared with
/// the schedule entries in the stored document.
pub use crate::store::document::{MAX_DOSE, MIN_DOSE};

/// Positional servo driving the feeder gate.
pub trait ServoPort: Send + 'static {
    fn set_angle(&mut self, degrees: u16);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedTiming {
    pub open_angle: u16,
    pub closed_angle: u16,
    pub hold_ms: u64,
    pub settle_ms: u64,
}

impl Default for FeedTiming {
    fn default() -> Self {
        Self {
            open_angle: 180,
            closed_angle: 0,
            hold_ms: 1000,
            settle_ms: 300,
        }
    }
}

pub struct FeederWorker<S> {
    busy: Arc<AtomicBool>,
    servo: Arc<Mutex<S>>,
    timing: FeedTiming,
}

impl<S: ServoPort> FeederWorker<S> {
    pub fn new(servo: S, timing: FeedTiming) -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            servo: Arc::new(Mutex::new(servo)),
            timing,
        }
    }

    pub fn timing(&self) -> FeedTiming {
        self.timing
    }

    fn run(servo: &Mutex<S>, timing: FeedTiming, dose: u8) {
        info!("Feeder: dispensing {} portion(s)", dose);
        let mut servo = servo.lock().unwrap_or_else(PoisonError::into_inner);
        for portion in 1..=dose {
            info!("Feeder: portion {}/{}", portion, dose);
            servo.set_angle(timing.open_angle);
            std::thread::sleep(Duration::from_millis(timing.hold_ms));
            servo.set_angle(timing.closed_angle);
            std::thread::sleep(Duration::from_millis(timing.settle_ms));
        }
        info!("Feeder: run complete");
    }
}

impl<S: ServoPort> FeederPort for FeederWorker<S> {
    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn start_feeding(&mut self, dose: u8) -> Result<(), FeederError> {
        if !(MIN_DOSE..=MAX_DOSE).contains(&dose) {
            return Err(FeederError::InvalidDose);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(FeederError::Busy);
        }

        let busy = self.busy.clone();
        let servo = self.servo.clone();
        let timing = self.timing;
        let spawned = std::thread::Builder::new()
            .name("feeder".into())
            .stack_size(6144)
            .spawn(move || {
                Self::run(&servo, timing, dose);
                busy.store(false, Ordering::Release);
            });

        if let Err(e) = spawned {
            error!("Feeder: worker spawn failed: {}", e);
            self.busy.store(false, Ordering::Release);
            return Err(FeederError::SpawnFailed);
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// LEDC servo (ESP-IDF)
// ───────────────────────────────────────────────────────────────

/// Hobby servo on an LEDC channel: 50 Hz, 0.5-2.5 ms pulse for 0-180°.
#[cfg(target_os = "espidf")]
pub struct LedcServo {
    driver: esp_idf_svc::hal::ledc::LedcDriver<'static>,
}

#[cfg(target_os = "espidf")]
impl LedcServo {
    const PERIOD_US: u32 = 20_000;
    const MIN_PULSE_US: u32 = 500;
    const MAX_PULSE_US: u32 = 2_500;

    pub fn new(driver: esp_idf_svc::hal::ledc::LedcDriver<'static>) -> Self {
        Self { driver }
    }

    fn duty_for(&self, degrees: u16) -> u32 {
        let degrees = u32::from(degrees.min(180));
        let pulse_us = Self::MIN_PULSE_US + (Self::MAX_PULSE_US - Self::MIN_PULSE_US) * degrees / 180;
        let max_duty = self.driver.get_max_duty();
        (u64::from(max_duty) * u64::from(pulse_us) / u64::from(Self::PERIOD_US)) as u32
    }
}

#[cfg(target_os = "espidf")]
impl ServoPort for LedcServo {
    fn set_angle(&mut self, degrees: u16) {
        let duty = self.duty_for(degrees);
        if let Err(e) = self.driver.set_duty(duty) {
            log::warn!("Feeder: servo duty {} rejected: {}", duty, e);
        }
    }
}
