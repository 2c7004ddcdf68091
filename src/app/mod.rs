//! Application core — lane orchestration, zero direct I/O.
//!
//! This module wires the ledger and the two lane controllers together
//! and exposes the operator-facing command API.  All interaction with
//! hardware happens through the **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod ports;
pub mod service;
pub mod status;
