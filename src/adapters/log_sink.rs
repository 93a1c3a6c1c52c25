//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A future MQTT or counter adapter would implement the same trait.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::config::TempUnit;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn unit_suffix(unit: TempUnit) -> &'static str {
    match unit {
        TempUnit::Celsius => "\u{00b0}C",
        TempUnit::Fahrenheit => "\u{00b0}F",
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { max_items } => {
                info!("START | window={} items", max_items);
            }
            AppEvent::SampleRecorded { value, unit } => {
                info!("SAMPLE | {:.2}{}", value, unit_suffix(*unit));
            }
            AppEvent::SensorFault => {
                info!("SENSOR | fault, sentinel recorded");
            }
            AppEvent::StorageDegraded { op, err } => {
                info!("STORAGE | {:?} degraded: {}", op, err);
            }
            AppEvent::WindowRefreshed { lines, bytes } => {
                info!("WINDOW | {} lines, {} B", lines, bytes);
            }
            AppEvent::BroadcastSent { clients } => {
                info!("PUSH | {} clients", clients);
            }
        }
    }
}
