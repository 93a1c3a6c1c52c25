//! Sensor subsystem.
//!
//! A single thermistor today.  Each driver implements
//! [`SamplePort`](crate::app::ports::SamplePort) so the monitoring core and
//! the HTTP on-demand path stay hardware-agnostic.

pub mod temperature;

pub use temperature::TemperatureSensor;
