//! Shared sensor readings.
//!
//! A water-quality sensor driver writes the latest temperature and TDS
//! values here; telemetry reads them through [`TemperatureProvider`].
//! Until such a driver is wired in, both read as zero.  Both cells are
//! single atomics, so writers never block the tick loop.

use core::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;

use crate::app::ports::TemperatureProvider;

#[derive(Debug, Default)]
struct Cells {
    temperature_bits: AtomicU32,
    tds_ppm: AtomicI32,
}

/// Last-value cell for the water readings.  Clones share the same cells.
#[derive(Debug, Clone, Default)]
pub struct SharedReadings {
    cells: Arc<Cells>,
}

impl SharedReadings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_temperature(&self, celsius: f32) {
        self.cells
            .temperature_bits
            .store(celsius.to_bits(), Ordering::Relaxed);
    }

    pub fn set_tds(&self, ppm: i32) {
        self.cells.tds_ppm.store(ppm, Ordering::Relaxed);
    }

    /// Store both readings from one sensor pass.
    pub fn update(&self, celsius: f32, ppm: i32) {
        self.set_temperature(celsius);
        self.set_tds(ppm);
    }
}

impl TemperatureProvider for SharedReadings {
    fn temperature_c(&self) -> f32 {
        f32::from_bits(self.cells.temperature_bits.load(Ordering::Relaxed))
    }

    fn tds_ppm(&self) -> i32 {
        self.cells.tds_ppm.load(Ordering::Relaxed)
    }
}
