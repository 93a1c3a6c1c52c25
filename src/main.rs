//! TempLog Firmware — Main Entry Point
//!
//! Hexagonal architecture around a single periodic monitoring tick.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  TemperatureSensor  LogEventSink   NvsAdapter   MonotonicClock │
//! │  (SamplePort)       (EventSink)    (ConfigPort) (Clock)        │
//! │  WifiAdapter        MdnsAdapter    MonitorServer               │
//! │  (Connectivity)     (discovery)    (HTTP + WS, BroadcastSink)  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            MonitorService (pure logic)                 │    │
//! │  │  sample → append → window → gate → push                │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  ReadingLog (SD card) · HistoryCache (shared) · event ring     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod config;
mod cache;
mod error;
mod events;
mod storage;

pub mod app;
mod adapters;
mod drivers;
mod sensors;
pub mod server;

// ── Imports ───────────────────────────────────────────────────
use std::sync::Arc;

use anyhow::Result;
use log::{error, info, warn};

use adapters::device_id::DeviceIdentity;
use adapters::log_sink::LogEventSink;
use adapters::mdns::MdnsAdapter;
use adapters::nvs::NvsAdapter;
use adapters::sdcard::SdCardStorage;
use adapters::time::MonotonicClock;
use adapters::wifi::{ConnectivityPort, WifiAdapter};
use app::ports::{Clock, ConfigPort};
use app::service::MonitorService;
use cache::HistoryCache;
use config::SystemConfig;
use events::Event;
use sensors::TemperatureSensor;
use server::channels::ClientMsg;
use storage::ReadingLog;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Platform bootstrap ─────────────────────────────────
    #[cfg(target_os = "espidf")]
    {
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;
    }
    #[cfg(not(target_os = "espidf"))]
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════╗");
    info!("║  TempLog v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            // Continue without NVS — config will not be persisted this session.
            // On next reboot, NVS should self-heal.
            NvsAdapter::default()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 3. Sensing path ───────────────────────────────────────
    // A failed ADC bring-up is not fatal: every sample faults and the
    // log records sentinels until the next reboot.
    if let Err(e) = drivers::adc::init() {
        error!("ADC init failed: {} — sensor reads will fault", e);
    }
    let sensor = Arc::new(TemperatureSensor::new());

    // ── 4. WiFi driver + removable storage ────────────────────
    let mut wifi = WifiAdapter::new();

    #[cfg(target_os = "espidf")]
    let storage = {
        use esp_idf_svc::eventloop::EspSystemEventLoop;
        use esp_idf_svc::nvs::EspDefaultNvsPartition;
        use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

        let peripherals = esp_idf_hal::peripherals::Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs_partition = EspDefaultNvsPartition::take()?;
        let driver = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs_partition))?;
        wifi.attach_driver(BlockingWifi::wrap(driver, sysloop)?);

        let pins = peripherals.pins;
        match SdCardStorage::mount_spi(
            peripherals.spi2,
            pins.gpio18,
            pins.gpio23,
            pins.gpio19,
            pins.gpio5,
        ) {
            Ok(s) => s,
            Err(e) => {
                warn!("SD mount failed ({}), running degraded: appends will be lost", e);
                SdCardStorage::unmounted()
            }
        }
    };
    #[cfg(not(target_os = "espidf"))]
    let storage = match SdCardStorage::mount_sim() {
        Ok(s) => s,
        Err(e) => anyhow::bail!("simulation storage unavailable: {}", e),
    };

    // ── 5. Device identity ────────────────────────────────────
    let identity = DeviceIdentity::from_efuse();
    info!("Device ID: {} (hostname: {})", identity.id, identity.hostname);

    let mut mdns =
        MdnsAdapter::new(identity.hostname.clone(), identity.id.clone(), config.http_port);

    // ── 6. Monitor service ────────────────────────────────────
    let log = ReadingLog::new(storage.log_path(config.log_file.as_str()));
    let cache = HistoryCache::new();
    let mut service = MonitorService::new(config.clone(), log, cache.clone());
    let clock = MonotonicClock::new();
    let mut log_sink = LogEventSink::new();

    service.start(&mut log_sink);

    // ── 7. Network bring-up ───────────────────────────────────
    if config.wifi_ssid.is_empty() {
        warn!("WiFi: no credentials provisioned, staying offline");
    } else {
        match wifi.set_credentials(config.wifi_ssid.as_str(), config.wifi_password.as_str()) {
            Ok(()) => {
                if let Err(e) = wifi.connect() {
                    warn!("WiFi: initial connect failed ({}), retrying in background", e);
                }
            }
            Err(e) => warn!("WiFi: stored credentials invalid ({}), staying offline", e),
        }
    }

    // ── 8. HTTP + WebSocket server ────────────────────────────
    #[cfg(target_os = "espidf")]
    let http = match server::MonitorServer::start(&config, cache.clone(), sensor.clone(), identity.id.as_str()) {
        Ok(srv) => srv,
        Err(e) => anyhow::bail!("HTTP server failed to start: {}", e),
    };
    #[cfg(target_os = "espidf")]
    let mut push = http.broadcaster();

    #[cfg(not(target_os = "espidf"))]
    let mut push = server::NullBroadcaster::new();

    // ── 9. Timers + watchdog ──────────────────────────────────
    // Timers start last so a slow WiFi association cannot queue up a
    // burst of stale sample ticks; the watchdog subscribes after the
    // blocking bring-up for the same reason.
    drivers::hw_timer::start_timers(config.tick_interval_ms);
    let watchdog = drivers::watchdog::Watchdog::subscribe();

    info!("System ready. Entering event loop.");

    // ── 10. Event loop ────────────────────────────────────────
    let mut ws_clients: usize = 0;
    #[cfg(not(target_os = "espidf"))]
    let mut status_elapsed_ms: u64 = 0;

    loop {
        // Simulate timer interrupts via sleep on non-espidf targets.
        // On hardware both tick kinds arrive from esp_timer callbacks.
        #[cfg(not(target_os = "espidf"))]
        {
            std::thread::sleep(std::time::Duration::from_millis(u64::from(
                config.tick_interval_ms,
            )));
            events::push_event(Event::SampleTick);
            status_elapsed_ms += u64::from(config.tick_interval_ms);
            if status_elapsed_ms >= 60_000 {
                events::push_event(Event::StatusTick);
                status_elapsed_ms = 0;
            }
        }

        // WebSocket lifecycle notices from the httpd task.
        while let Ok(msg) = server::channels::CLIENT_CHANNEL.try_receive() {
            match msg {
                ClientMsg::Connected { session } => {
                    ws_clients += 1;
                    info!("Client {} subscribed ({} watching)", session, ws_clients);
                }
                ClientMsg::Disconnected { session } => {
                    ws_clients = ws_clients.saturating_sub(1);
                    info!("Client {} gone ({} watching)", session, ws_clients);
                }
            }
        }

        // Process all pending events.
        events::drain_events(|event| match event {
            Event::SampleTick => {
                service.tick(sensor.as_ref(), &clock, &mut log_sink, &mut push);
            }

            Event::StatusTick => {
                info!(
                    "Status: up {} s, {} ticks, {} clients, window {} B, rssi {:?}",
                    clock.uptime_secs(),
                    service.tick_count(),
                    ws_clients,
                    cache.snapshot().len(),
                    wifi.rssi(),
                );
            }
        });

        // WiFi reconnection poll (exponential backoff).
        wifi.poll(clock.now_ms());

        // mDNS follows the station link: advertise once the interface
        // is up, withdraw on a drop so a reconnect re-registers.
        mdns.track_link(wifi.is_connected());

        // Feed watchdog on every iteration.
        watchdog.feed();

        // Idle between events; the sample timer wakes the loop.
        #[cfg(target_os = "espidf")]
        esp_idf_hal::delay::FreeRtos::delay_ms(50);
    }
}
