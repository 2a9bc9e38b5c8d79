//! I2C EEPROM adapter (AT24C32-class, 4 KiB).
//!
//! Implements [`ByteStore`] over any `embedded-hal` 1.0 I2C bus.
//!
//! ```text
//!   write_bytes(addr, data)
//!        │
//!        ├─▶ page 0: [addr_hi, addr_lo, ≤32 bytes] ─▶ settle 10 ms
//!        ├─▶ page 1: ...                             ─▶ settle 10 ms
//!        └─▶ ...
//! ```
//!
//! Writes never cross a 32-byte page boundary; the chip would wrap
//! inside the page otherwise.  Reads are a single sequential transfer.
//!
//! [`MemoryEeprom`] is the host simulation used by tests and the
//! simulator build.

use core::ops::Range;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, warn};

use crate::app::ports::ByteStore;
use crate::error::StorageError;

/// Device capacity in bytes.
pub const EEPROM_CAPACITY: usize = 4096;
/// Internal write page size.
pub const PAGE_SIZE: usize = 32;
/// Write cycle time after each page.
pub const WRITE_SETTLE_MS: u32 = 10;
/// Default 7-bit bus address (A2..A0 strapped low).
pub const DEFAULT_I2C_ADDRESS: u8 = 0x50;

fn check_bounds(address: u16, len: usize, capacity: usize) -> Result<(), StorageError> {
    if address as usize + len > capacity {
        warn!(
            "EEPROM: access of {} bytes at 0x{:04X} exceeds {} bytes",
            len, address, capacity
        );
        return Err(StorageError::OutOfBounds { address, len });
    }
    Ok(())
}

/// Split `[address, address + len)` into chunks that never cross a page
/// boundary.  Yields `(chip address, range into the caller's buffer)`.
pub fn page_chunks(address: u16, len: usize) -> impl Iterator<Item = (u16, Range<usize>)> {
    let mut offset = 0usize;
    core::iter::from_fn(move || {
        if offset >= len {
            return None;
        }
        let at = address as usize + offset;
        let room = PAGE_SIZE - at % PAGE_SIZE;
        let n = room.min(len - offset);
        let chunk = (at as u16, offset..offset + n);
        offset += n;
        Some(chunk)
    })
}

// ───────────────────────────────────────────────────────────────
// Hardware adapter
// ───────────────────────────────────────────────────────────────

pub struct At24Eeprom<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<I2C: I2c, D: DelayNs> At24Eeprom<I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_address(i2c, delay, DEFAULT_I2C_ADDRESS)
    }

    pub fn with_address(i2c: I2C, delay: D, address: u8) -> Self {
        Self { i2c, delay, address }
    }

    /// Release the bus.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C: I2c, D: DelayNs> ByteStore for At24Eeprom<I2C, D> {
    fn read_bytes(&mut self, address: u16, buf: &mut [u8]) -> Result<(), StorageError> {
        check_bounds(address, buf.len(), EEPROM_CAPACITY)?;
        if buf.is_empty() {
            return Ok(());
        }
        self.i2c
            .write_read(self.address, &address.to_be_bytes(), buf)
            .map_err(|_| StorageError::Bus)
    }

    fn write_bytes(&mut self, address: u16, data: &[u8]) -> Result<(), StorageError> {
        check_bounds(address, data.len(), EEPROM_CAPACITY)?;
        let mut frame = [0u8; PAGE_SIZE + 2];
        for (chip_addr, range) in page_chunks(address, data.len()) {
            let n = range.len();
            frame[..2].copy_from_slice(&chip_addr.to_be_bytes());
            frame[2..2 + n].copy_from_slice(&data[range]);
            self.i2c
                .write(self.address, &frame[..2 + n])
                .map_err(|_| StorageError::Bus)?;
            self.delay.delay_ms(WRITE_SETTLE_MS);
        }
        debug!("EEPROM: wrote {} bytes at 0x{:04X}", data.len(), address);
        Ok(())
    }

    fn capacity(&self) -> usize {
        EEPROM_CAPACITY
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation backend
// ───────────────────────────────────────────────────────────────

/// RAM-backed EEPROM.  Starts erased (all `0xFF`), like a new chip.
#[derive(Debug, Clone)]
pub struct MemoryEeprom {
    cells: Vec<u8>,
    write_count: usize,
    page_writes: usize,
    fail_reads: bool,
    fail_writes: bool,
}

impl MemoryEeprom {
    pub fn new() -> Self {
        Self {
            cells: vec![0xFF; EEPROM_CAPACITY],
            write_count: 0,
            page_writes: 0,
            fail_reads: false,
            fail_writes: false,
        }
    }

    /// Number of successful `write_bytes` calls.
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    /// Number of physical page programs those calls would take.
    pub fn page_writes(&self) -> usize {
        self.page_writes
    }

    pub fn fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn contents(&self) -> &[u8] {
        &self.cells
    }
}

impl Default for MemoryEeprom {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteStore for MemoryEeprom {
    fn read_bytes(&mut self, address: u16, buf: &mut [u8]) -> Result<(), StorageError> {
        check_bounds(address, buf.len(), self.cells.len())?;
        if self.fail_reads {
            return Err(StorageError::Bus);
        }
        let start = address as usize;
        buf.copy_from_slice(&self.cells[start..start + buf.len()]);
        Ok(())
    }

    fn write_bytes(&mut self, address: u16, data: &[u8]) -> Result<(), StorageError> {
        check_bounds(address, data.len(), self.cells.len())?;
        if self.fail_writes {
            return Err(StorageError::Bus);
        }
        for (chip_addr, range) in page_chunks(address, data.len()) {
            let start = chip_addr as usize;
            self.cells[start..start + range.len()].copy_from_slice(&data[range]);
            self.page_writes += 1;
        }
        self.write_count += 1;
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.cells.len()
    }
}
