//! ParkGate firmware library.
//!
//! Exposes the lane controllers, ticket ledger and event bus for
//! integration testing and host simulation. All ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod events;
pub mod fsm;
pub mod gate;
pub mod tickets;
pub mod timer;

pub mod error;
pub mod pins;

mod sync;

// Device adapters; host builds get simulation stubs from the same modules.
pub mod adapters;
pub mod drivers;
