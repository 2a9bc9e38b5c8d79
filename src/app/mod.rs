//! Application core: pure domain logic, zero I/O.
//!
//! Link bring-up, telemetry cadence and RPC routing for the Aquarium
//! Guardian.  All interaction with drivers happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod events;
pub mod orchestrator;
pub mod ports;
