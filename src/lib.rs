//! TempLog firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod server;
pub mod storage;

// Hardware-facing modules; the device implementations inside are guarded
// by cfg attributes, so host builds get the simulation paths.
pub mod adapters;
pub mod drivers;
pub mod sensors;
