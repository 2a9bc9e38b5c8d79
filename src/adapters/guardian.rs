//! Guardian proxy: the device-side aggregate handed to the orchestrator.
//!
//! Bundles the configuration store, the feeding worker and the shared
//! sensor readings behind the capability traits, so RPC handlers see
//! one narrow `RpcContext` and telemetry sees one `TemperatureProvider`.
//! A timezone change is persisted and then applied to the C runtime.

use log::warn;

use crate::app::ports::{
    ByteStore, FeederPort, ScheduleStore, TemperatureLimitStore, TemperatureProvider,
    TimezoneStore,
};
use crate::error::{ConfigError, FeederError};
use crate::store::ConfigStore;
use crate::store::document::{FeedingSchedule, FeedingScheduleEntry, TemperatureLimits, Timezone};

use super::hardware::SharedReadings;
use super::sntp::apply_posix_timezone;

pub struct GuardianProxy<B, F> {
    config: ConfigStore<B>,
    feeder: F,
    readings: SharedReadings,
}

impl<B: ByteStore, F: FeederPort> GuardianProxy<B, F> {
    pub fn new(config: ConfigStore<B>, feeder: F, readings: SharedReadings) -> Self {
        Self {
            config,
            feeder,
            readings,
        }
    }

    pub fn config(&self) -> &ConfigStore<B> {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigStore<B> {
        &mut self.config
    }

    pub fn feeder(&self) -> &F {
        &self.feeder
    }

    pub fn readings(&self) -> &SharedReadings {
        &self.readings
    }
}

impl<B: ByteStore, F> ScheduleStore for GuardianProxy<B, F> {
    fn schedule(&self) -> FeedingSchedule {
        ScheduleStore::schedule(&self.config)
    }

    fn upsert_schedule_entry(&mut self, entry: FeedingScheduleEntry) -> Result<(), ConfigError> {
        self.config.upsert_schedule_entry(entry)
    }

    fn remove_schedule_entry(&mut self, slot_id: u8) -> Result<(), ConfigError> {
        self.config.remove_schedule_entry(slot_id)
    }
}

impl<B: ByteStore, F> TemperatureLimitStore for GuardianProxy<B, F> {
    fn temperature_limits(&self) -> TemperatureLimits {
        TemperatureLimitStore::temperature_limits(&self.config)
    }

    fn set_temperature_limits(&mut self, limits: TemperatureLimits) -> Result<(), ConfigError> {
        self.config.set_temperature_limits(limits)
    }
}

impl<B: ByteStore, F> TimezoneStore for GuardianProxy<B, F> {
    fn timezone(&self) -> Timezone {
        TimezoneStore::timezone(&self.config)
    }

    /// The zone is applied even when persisting it failed: it is live
    /// in memory either way.
    fn set_timezone(&mut self, timezone: &str) -> Result<(), ConfigError> {
        let stored = self.config.set_timezone(timezone);
        if matches!(stored, Err(ConfigError::InvalidValue(_))) {
            return stored;
        }
        if let Err(e) = apply_posix_timezone(timezone) {
            warn!("Guardian: timezone '{}' not applied: {}", timezone, e);
        }
        stored
    }
}

impl<B, F: FeederPort> FeederPort for GuardianProxy<B, F> {
    fn is_busy(&self) -> bool {
        self.feeder.is_busy()
    }

    fn start_feeding(&mut self, dose: u8) -> Result<(), FeederError> {
        self.feeder.start_feeding(dose)
    }
}

impl<B, F> TemperatureProvider for GuardianProxy<B, F> {
    fn temperature_c(&self) -> f32 {
        self.readings.temperature_c()
    }

    fn tds_ppm(&self) -> i32 {
        self.readings.tds_ppm()
    }
}
