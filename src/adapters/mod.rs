//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements       | Connects to                  |
//! |-------------|------------------|------------------------------|
//! | `log_sink`  | EventSink        | Serial log output            |
//! | `nvs`       | ConfigPort       | NVS / in-memory store        |
//! | `sdcard`    | —                | SD over SPI, FATFS mount     |
//! | `time`      | Clock            | ESP32 system timer           |
//! | `wifi`      | ConnectivityPort | ESP-IDF WiFi STA             |
//! | `mdns`      | —                | mDNS advertisement           |
//! | `device_id` | —                | eFuse factory MAC            |

pub mod device_id;
pub mod log_sink;
pub mod mdns;
pub mod nvs;
pub mod sdcard;
pub mod time;
pub mod wifi;
