//! Device identity derived from the ESP32 factory MAC address.
//!
//! The last three bytes of the factory-burned eFuse MAC yield a stable,
//! human-readable identity: a short ID (`TL-XXYYZZ`) reported in the
//! `/config` read-back payload and an mDNS hostname
//! (`templog-xxyyzz.local`).  Both are derived once at boot.

use core::fmt::Write;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Identity strings derived from the factory MAC.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    /// Short ID, `TL-XXYYZZ` (uppercase hex).
    pub id: heapless::String<16>,
    /// mDNS hostname, `templog-xxyyzz` (lowercase, without `.local`).
    pub hostname: heapless::String<24>,
}

impl DeviceIdentity {
    /// Derive both strings from a MAC.
    pub fn from_mac(mac: &MacAddress) -> Self {
        let mut id = heapless::String::new();
        let _ = write!(id, "TL-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
        let mut hostname = heapless::String::new();
        let _ = write!(hostname, "templog-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
        Self { id, hostname }
    }

    /// Read the factory MAC from eFuse and derive the identity.
    pub fn from_efuse() -> Self {
        Self::from_mac(&read_mac())
    }
}

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}
