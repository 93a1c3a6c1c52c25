//! Peripheral drivers and hardware helpers.

pub mod adc;
pub mod hw_timer;
pub mod watchdog;
