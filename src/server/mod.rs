//! HTTP + WebSocket interface.
//!
//! Serves the dashboard and the plain-text data routes, and pushes the
//! cached history window to every connected WebSocket client.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        HTTP Stack                            │
//! │                                                              │
//! │  GET /                → dashboard (static HTML)              │
//! │  GET /temperature     → fresh sensor read, °C (text/plain)   │
//! │  GET /historical_data → cached window (text/plain)           │
//! │  GET /config          → read-only config (JSON)              │
//! │  WS  /ws              → window pushed on broadcast ticks     │
//! │                                                              │
//! │  Handlers run on the httpd task.  The tick loop reaches      │
//! │  clients through `WsBroadcaster`, a shared table of          │
//! │  detached senders registered by the `/ws` handler.           │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod channels;

use serde::Serialize;

use crate::app::ports::BroadcastSink;
use crate::config::{SystemConfig, TempUnit};

#[cfg(target_os = "espidf")]
use std::sync::{Arc, Mutex, PoisonError};

#[cfg(target_os = "espidf")]
use esp_idf_svc::http::Method;
#[cfg(target_os = "espidf")]
use esp_idf_svc::http::server::ws::EspHttpWsDetachedSender;
#[cfg(target_os = "espidf")]
use esp_idf_svc::http::server::{Configuration as HttpConfig, EspHttpServer};
#[cfg(target_os = "espidf")]
use esp_idf_svc::io::{EspIOError, Write};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::EspError;
#[cfg(target_os = "espidf")]
use esp_idf_svc::ws::FrameType;
#[cfg(target_os = "espidf")]
use log::{error, info, warn};

#[cfg(target_os = "espidf")]
use crate::app::ports::SamplePort;
#[cfg(target_os = "espidf")]
use crate::cache::HistoryCache;
#[cfg(target_os = "espidf")]
use crate::error::{CommsError, Result};
#[cfg(target_os = "espidf")]
use crate::sensors::TemperatureSensor;
#[cfg(target_os = "espidf")]
use crate::server::channels::ClientMsg;

/// Dashboard page, baked into the binary at build time.
pub const DASHBOARD_HTML: &str = include_str!("dashboard.html");

// ── Config read-back payload ─────────────────────────────────

/// What `GET /config` serves.  A separate type from [`SystemConfig`]:
/// WiFi credentials must never leave the device.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReadback {
    pub device_id: String,
    pub version: &'static str,
    pub unit: TempUnit,
    pub max_items: u16,
    pub tick_interval_ms: u32,
    pub broadcast_interval_ms: u32,
    pub log_file: String,
    pub http_port: u16,
}

impl ConfigReadback {
    pub fn new(config: &SystemConfig, device_id: &str) -> Self {
        Self {
            device_id: String::from(device_id),
            version: env!("CARGO_PKG_VERSION"),
            unit: config.unit,
            max_items: config.max_items,
            tick_interval_ms: config.tick_interval_ms,
            broadcast_interval_ms: config.broadcast_interval_ms,
            log_file: String::from(config.log_file.as_str()),
            http_port: config.http_port,
        }
    }
}

// ── WebSocket broadcaster ────────────────────────────────────

/// Shared table of detached WebSocket senders, one per connected client.
///
/// The `/ws` handler adds and removes entries from the httpd task; the
/// tick loop fans the window out through [`BroadcastSink::broadcast`].
/// Clients whose socket has gone away are dropped during the fan-out,
/// so the table never accumulates dead senders.
#[cfg(target_os = "espidf")]
#[derive(Clone, Default)]
pub struct WsBroadcaster {
    clients: Arc<Mutex<Vec<(i32, EspHttpWsDetachedSender)>>>,
}

#[cfg(target_os = "espidf")]
impl WsBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(i32, EspHttpWsDetachedSender)>> {
        // A poisoned table still holds valid senders.
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add(&self, session: i32, sender: EspHttpWsDetachedSender) {
        let mut clients = self.lock();
        clients.retain(|(s, _)| *s != session);
        clients.push((session, sender));
        info!("ws: session {} connected ({} open)", session, clients.len());
    }

    fn remove(&self, session: i32) {
        let mut clients = self.lock();
        clients.retain(|(s, _)| *s != session);
        info!("ws: session {} closed ({} open)", session, clients.len());
    }

    pub fn client_count(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(target_os = "espidf")]
impl BroadcastSink for WsBroadcaster {
    fn broadcast(&mut self, payload: &str) -> usize {
        let mut clients = self.lock();
        clients.retain_mut(|(session, sender)| {
            if sender.is_closed() {
                return false;
            }
            match sender.send(FrameType::Text(false), payload.as_bytes()) {
                Ok(()) => true,
                Err(e) => {
                    warn!("ws: send to session {} failed ({}), dropping", session, e);
                    false
                }
            }
        });
        clients.len()
    }
}

/// Stand-in sink for simulation builds: counts nobody, sends nothing.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBroadcaster;

#[cfg(not(target_os = "espidf"))]
impl NullBroadcaster {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(target_os = "espidf"))]
impl BroadcastSink for NullBroadcaster {
    fn broadcast(&mut self, payload: &str) -> usize {
        log::debug!("push(sim): {} B window, no clients", payload.len());
        0
    }
}

// ── HTTP server ──────────────────────────────────────────────

/// Owns the httpd instance; routes are registered once at startup and
/// live for the lifetime of the process.
#[cfg(target_os = "espidf")]
pub struct MonitorServer {
    _server: EspHttpServer<'static>,
    broadcaster: WsBroadcaster,
}

#[cfg(target_os = "espidf")]
fn http_fail<E: core::fmt::Display>(stage: &'static str) -> impl FnOnce(E) -> crate::error::Error {
    move |e| {
        error!("http: {} failed: {}", stage, e);
        CommsError::HttpBindFailed.into()
    }
}

#[cfg(target_os = "espidf")]
impl MonitorServer {
    /// Bind the server and register all routes.
    ///
    /// `/temperature` samples the sensor from the httpd task, so it
    /// stays fresh even when the tick loop is stalled on storage.
    pub fn start(
        config: &SystemConfig,
        cache: HistoryCache,
        sensor: Arc<TemperatureSensor>,
        device_id: &str,
    ) -> Result<Self> {
        let mut server = EspHttpServer::new(&HttpConfig {
            http_port: config.http_port,
            ..HttpConfig::default()
        })
        .map_err(http_fail("bind"))?;

        let broadcaster = WsBroadcaster::new();

        server
            .fn_handler("/", Method::Get, |req| {
                let mut resp =
                    req.into_response(200, Some("OK"), &[("Content-Type", "text/html")])?;
                resp.write_all(DASHBOARD_HTML.as_bytes())?;
                Ok::<(), EspIOError>(())
            })
            .map_err(http_fail("dashboard route"))?;

        // Always Celsius regardless of the configured logging unit.  A
        // faulted sensor answers 200 with the NaN sentinel, the same
        // value the log records; clients get data, never an error page.
        let temp_sensor = sensor.clone();
        server
            .fn_handler("/temperature", Method::Get, move |req| {
                let body = match temp_sensor.sample(TempUnit::Celsius) {
                    Ok(celsius) => format!("{celsius:.2}"),
                    Err(e) => {
                        warn!("http: /temperature sensor fault: {}", e);
                        format!("{:.2}", f32::NAN)
                    }
                };
                let mut resp =
                    req.into_response(200, Some("OK"), &[("Content-Type", "text/plain")])?;
                resp.write_all(body.as_bytes())?;
                Ok::<(), EspIOError>(())
            })
            .map_err(http_fail("temperature route"))?;

        // Serves the cache, never the filesystem: a dying SD card can
        // slow the tick loop but not the dashboard.
        let window_cache = cache.clone();
        server
            .fn_handler("/historical_data", Method::Get, move |req| {
                let window = window_cache.snapshot();
                let mut resp =
                    req.into_response(200, Some("OK"), &[("Content-Type", "text/plain")])?;
                resp.write_all(window.as_bytes())?;
                Ok::<(), EspIOError>(())
            })
            .map_err(http_fail("history route"))?;

        // Encoded once at startup; config is immutable while running.
        let config_json = match serde_json::to_string(&ConfigReadback::new(config, device_id)) {
            Ok(s) => s,
            Err(e) => {
                warn!("http: config read-back encode failed: {}", e);
                String::from("{}")
            }
        };
        server
            .fn_handler("/config", Method::Get, move |req| {
                let mut resp = req.into_response(
                    200,
                    Some("OK"),
                    &[("Content-Type", "application/json")],
                )?;
                resp.write_all(config_json.as_bytes())?;
                Ok::<(), EspIOError>(())
            })
            .map_err(http_fail("config route"))?;

        let ws_clients = broadcaster.clone();
        let ws_cache = cache.clone();
        server
            .ws_handler("/ws", move |ws| {
                if ws.is_new() {
                    let session = ws.session();
                    let sender = ws.create_detached_sender()?;
                    // Late joiners get the current window up front instead
                    // of waiting out the broadcast interval.
                    let window = ws_cache.snapshot();
                    ws.send(FrameType::Text(false), window.as_bytes())?;
                    ws_clients.add(session, sender);
                    if channels::CLIENT_CHANNEL
                        .try_send(ClientMsg::Connected { session })
                        .is_err()
                    {
                        warn!("ws: client channel full, connect notice dropped");
                    }
                } else if ws.is_closed() {
                    let session = ws.session();
                    ws_clients.remove(session);
                    if channels::CLIENT_CHANNEL
                        .try_send(ClientMsg::Disconnected { session })
                        .is_err()
                    {
                        warn!("ws: client channel full, disconnect notice dropped");
                    }
                }
                Ok::<(), EspError>(())
            })
            .map_err(http_fail("ws route"))?;

        info!(
            "http: listening on port {} (/, /temperature, /historical_data, /config, /ws)",
            config.http_port
        );

        Ok(Self {
            _server: server,
            broadcaster,
        })
    }

    /// Handle the tick loop uses to push windows and count clients.
    pub fn broadcaster(&self) -> WsBroadcaster {
        self.broadcaster.clone()
    }
}

// ── Tests ────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_wires_up_every_route() {
        assert!(DASHBOARD_HTML.contains("/temperature"));
        assert!(DASHBOARD_HTML.contains("/historical_data"));
        assert!(DASHBOARD_HTML.contains("/ws"));
    }

    #[test]
    fn config_readback_omits_credentials() {
        let config = SystemConfig {
            wifi_ssid: heapless::String::try_from("home-net").unwrap(),
            wifi_password: heapless::String::try_from("hunter2").unwrap(),
            ..SystemConfig::default()
        };

        let json = serde_json::to_string(&ConfigReadback::new(&config, "TL-AABBCC")).unwrap();
        assert!(json.contains("\"device_id\":\"TL-AABBCC\""));
        assert!(json.contains("\"max_items\":50"));
        assert!(json.contains("\"http_port\":80"));
        assert!(!json.contains("home-net"));
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("ssid"));
        assert!(!json.contains("password"));
    }

    #[cfg(not(target_os = "espidf"))]
    #[test]
    fn null_broadcaster_reaches_nobody() {
        let mut sink = NullBroadcaster::new();
        assert_eq!(sink.broadcast("21.50\n"), 0);
    }
}
