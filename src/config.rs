//! System configuration parameters
//!
//! All tunable parameters for the templog device.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

/// Temperature unit for sampling and logging.
///
/// The unit is part of the measurement: a logged line is a number in the
/// configured unit with no marker, so changing this mid-log mixes scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TempUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TempUnit {
    /// Convert a Celsius reading into this unit.
    pub fn from_celsius(self, celsius: f32) -> f32 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Measurement ---
    /// Unit used when sampling and logging readings
    pub unit: TempUnit,
    /// Maximum number of log lines served as the historical window
    pub max_items: u16,

    // --- Timing ---
    /// Main loop tick interval (milliseconds): one sample + one window
    /// recompute per tick
    pub tick_interval_ms: u32,
    /// Minimum interval between WebSocket pushes of the window (milliseconds)
    pub broadcast_interval_ms: u32,

    // --- Storage ---
    /// Log file name, created under the storage mount root
    pub log_file: heapless::String<32>,

    // --- Network ---
    /// HTTP server port
    pub http_port: u16,
    /// WiFi station SSID (empty = not provisioned)
    pub wifi_ssid: heapless::String<32>,
    /// WiFi station password (empty = open network)
    pub wifi_password: heapless::String<64>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Measurement
            unit: TempUnit::Celsius,
            max_items: 50,

            // Timing: one sample every 5s, at most one push every 30s
            tick_interval_ms: 5_000,
            broadcast_interval_ms: 30_000,

            // Storage
            log_file: heapless::String::try_from("temperature_log.txt").unwrap_or_default(),

            // Network
            http_port: 80,
            wifi_ssid: heapless::String::new(),
            wifi_password: heapless::String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert_eq!(c.unit, TempUnit::Celsius);
        assert!(c.max_items > 0);
        assert!(c.tick_interval_ms > 0);
        assert!(c.broadcast_interval_ms > 0);
        assert!(!c.log_file.is_empty());
        assert!(c.http_port > 0);
    }

    #[test]
    fn timing_ratios_make_sense() {
        let c = SystemConfig::default();
        assert!(
            c.tick_interval_ms < c.broadcast_interval_ms,
            "ticks should be more frequent than broadcasts"
        );
        assert_eq!(
            c.broadcast_interval_ms % c.tick_interval_ms,
            0,
            "default broadcast interval should be a whole number of ticks"
        );
    }

    #[test]
    fn unit_conversion() {
        assert!((TempUnit::Celsius.from_celsius(21.5) - 21.5).abs() < f32::EPSILON);
        assert!((TempUnit::Fahrenheit.from_celsius(0.0) - 32.0).abs() < 0.001);
        assert!((TempUnit::Fahrenheit.from_celsius(100.0) - 212.0).abs() < 0.001);
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.unit, c2.unit);
        assert_eq!(c.max_items, c2.max_items);
        assert_eq!(c.tick_interval_ms, c2.tick_interval_ms);
        assert_eq!(c.log_file, c2.log_file);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = SystemConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: SystemConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.max_items, c2.max_items);
        assert_eq!(c.broadcast_interval_ms, c2.broadcast_interval_ms);
        assert_eq!(c.wifi_ssid, c2.wifi_ssid);
    }
}
