//! Device identity derived from the ESP32 factory MAC address.
//!
//! The captive-portal SSID is `coompel-XXYY`, the last two MAC bytes in
//! uppercase hex. It is stable across reboots (eFuse MAC) and printed on
//! the WiFi setup screen.

use core::fmt::Write;

/// Portal SSID, `coompel-XXYY` (12 chars).
pub type ApNameString = heapless::String<16>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

pub const AP_NAME_PREFIX: &str = "coompel";

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the buffer is exactly six bytes as the API requires.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn ap_name(mac: &MacAddress) -> ApNameString {
    let mut name = ApNameString::new();
    let _ = write!(name, "{}-{:02X}{:02X}", AP_NAME_PREFIX, mac[4], mac[5]);
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ap_name_uses_last_two_bytes() {
        let mac = [0x00, 0x11, 0x22, 0xAA, 0xBB, 0xCC];
        assert_eq!(ap_name(&mac).as_str(), "coompel-BBCC");
    }

    #[test]
    fn sim_mac_is_stable() {
        assert_eq!(read_mac(), read_mac());
        assert_eq!(ap_name(&read_mac()).as_str(), "coompel-CAFE");
    }
}
