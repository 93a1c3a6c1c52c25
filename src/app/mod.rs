//! Application core — pure domain logic, zero hardware I/O.
//!
//! This module contains the business rules for the temperature monitor:
//! the per-tick measurement pipeline and the broadcast cadence gate.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod events;
pub mod gate;
pub mod ports;
pub mod service;
