//! Aquarium Guardian firmware library.
//!
//! Connectivity, RPC and configuration for the aquarium controller.
//! Exposes the pure-logic modules for integration testing. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod fsm;
pub mod rpc;
pub mod store;
pub mod timer;
pub mod topics;

pub mod adapters;
