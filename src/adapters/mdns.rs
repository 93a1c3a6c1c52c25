//! mDNS service advertisement adapter.
//!
//! Advertises two services on the configured HTTP port: `_templog._tcp`
//! with TXT records for firmware version and device ID, and a plain
//! `_http._tcp` entry so generic discovery tools find the dashboard.
//! Uses raw ESP-IDF mDNS calls on device and is a log-only stand-in on
//! simulation targets.
//!
//! Lifecycle is tied to WiFi: start on connect, stop on disconnect.

use log::info;

const MDNS_SERVICE_TYPE: &str = "_templog";
#[allow(dead_code)]
const MDNS_SERVICE_PROTO: &str = "_tcp";

/// mDNS advertisement adapter.
pub struct MdnsAdapter {
    hostname: heapless::String<24>,
    device_id: heapless::String<16>,
    port: u16,
    active: bool,
}

impl MdnsAdapter {
    pub fn new(hostname: heapless::String<24>, device_id: heapless::String<16>, port: u16) -> Self {
        Self {
            hostname,
            device_id,
            port,
            active: false,
        }
    }

    /// Whether mDNS is currently advertising.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start mDNS hostname + service advertisement.
    /// Call after WiFi is connected and has an IP.
    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.platform_start();
        self.active = true;
        info!(
            "mDNS: advertising {}.local → {}:{} (device={})",
            self.hostname, MDNS_SERVICE_TYPE, self.port, self.device_id
        );
    }

    /// Stop mDNS advertisement.
    /// Call when the station link drops.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.platform_stop();
        self.active = false;
        info!("mDNS: stopped");
    }

    /// Follow the station link: advertise on link-up, withdraw on
    /// link-down.  Safe to call every loop iteration; only a transition
    /// against the current advertising state does any work, so a later
    /// background reconnect re-registers automatically.
    pub fn track_link(&mut self, link_up: bool) {
        if link_up && !self.active {
            self.start();
        } else if !link_up && self.active {
            self.stop();
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&self) {
        use esp_idf_svc::sys::*;
        unsafe {
            let ret = mdns_init();
            if ret != ESP_OK {
                log::error!("mDNS: mdns_init failed ({})", ret);
                return;
            }

            let mut hostname_buf = [0u8; 32];
            let hb = self.hostname.as_bytes();
            let hl = hb.len().min(31);
            hostname_buf[..hl].copy_from_slice(&hb[..hl]);
            mdns_hostname_set(hostname_buf.as_ptr() as *const _);
            mdns_instance_name_set(b"TempLog Monitor\0".as_ptr() as *const _);

            let svc_type = b"_templog\0";
            let svc_proto = b"_tcp\0";
            mdns_service_add(
                b"TempLog\0".as_ptr() as *const _,
                svc_type.as_ptr() as *const _,
                svc_proto.as_ptr() as *const _,
                self.port,
                core::ptr::null_mut(),
                0,
            );

            // Add TXT records.
            let ver = concat!(env!("CARGO_PKG_VERSION"), "\0");
            let mut id_buf = [0u8; 24];
            let ib = self.device_id.as_bytes();
            let il = ib.len().min(23);
            id_buf[..il].copy_from_slice(&ib[..il]);

            mdns_service_txt_item_set(
                svc_type.as_ptr() as *const _,
                svc_proto.as_ptr() as *const _,
                b"version\0".as_ptr() as *const _,
                ver.as_ptr() as *const _,
            );
            mdns_service_txt_item_set(
                svc_type.as_ptr() as *const _,
                svc_proto.as_ptr() as *const _,
                b"id\0".as_ptr() as *const _,
                id_buf.as_ptr() as *const _,
            );

            // Second registration under the generic HTTP type so
            // browsers and `dns-sd -B _http._tcp` see the dashboard.
            let http_type = b"_http\0";
            mdns_service_add(
                b"TempLog Dashboard\0".as_ptr() as *const _,
                http_type.as_ptr() as *const _,
                svc_proto.as_ptr() as *const _,
                self.port,
                core::ptr::null_mut(),
                0,
            );
            mdns_service_txt_item_set(
                http_type.as_ptr() as *const _,
                svc_proto.as_ptr() as *const _,
                b"path\0".as_ptr() as *const _,
                b"/\0".as_ptr() as *const _,
            );
        }
        info!(
            "mDNS(espidf): registered {}.local {} + _http on port {} v={}",
            self.hostname,
            MDNS_SERVICE_TYPE,
            self.port,
            env!("CARGO_PKG_VERSION")
        );
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&self) {
        info!(
            "mDNS(sim): registered {}.local {}:{} v={} id={}",
            self.hostname,
            MDNS_SERVICE_TYPE,
            self.port,
            env!("CARGO_PKG_VERSION"),
            self.device_id
        );
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&self) {
        unsafe {
            esp_idf_svc::sys::mdns_free();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&self) {
        info!("mDNS(sim): unregistered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_adapter() -> MdnsAdapter {
        let mut hostname = heapless::String::<24>::new();
        hostname.push_str("templog-aabbcc").ok();
        let mut device_id = heapless::String::<16>::new();
        device_id.push_str("TL-AABBCC").ok();
        MdnsAdapter::new(hostname, device_id, 80)
    }

    #[test]
    fn start_stop_lifecycle() {
        let mut m = make_adapter();
        assert!(!m.is_active());
        m.start();
        assert!(m.is_active());
        m.stop();
        assert!(!m.is_active());
    }

    #[test]
    fn double_start_is_idempotent() {
        let mut m = make_adapter();
        m.start();
        m.start(); // no panic, still active
        assert!(m.is_active());
    }

    #[test]
    fn double_stop_is_idempotent() {
        let mut m = make_adapter();
        m.stop(); // not active, no panic
        assert!(!m.is_active());
    }

    #[test]
    fn advertisement_follows_link_transitions() {
        let mut m = make_adapter();

        m.track_link(false); // still offline at boot
        assert!(!m.is_active());

        m.track_link(true); // link came up
        assert!(m.is_active());
        m.track_link(true); // steady link, stays registered
        assert!(m.is_active());

        m.track_link(false); // link dropped
        assert!(!m.is_active());

        m.track_link(true); // background reconnect re-advertises
        assert!(m.is_active());
    }
}
