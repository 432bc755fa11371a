//! Vendor lookup by OUI prefix.

use crate::mac::MacAddress;

pub const UNKNOWN_VENDOR: &str = "Unknown Device";

/// Small built-in table covering the vendors most commonly seen as
/// stations. Keys are the first three octets, lowercase.
const OUI_TABLE: &[(&str, &str)] = &[
    ("00:50:f2", "Microsoft"),
    ("00:0c:e7", "Apple"),
    ("00:17:f2", "Apple"),
    ("ac:de:48", "Apple"),
    ("f8:ff:c2", "Apple"),
    ("00:1a:11", "Google"),
    ("94:65:9c", "Samsung"),
    ("00:23:76", "Samsung"),
    ("78:52:1a", "Samsung"),
    ("8c:71:f8", "Samsung"),
    ("b0:72:bf", "OnePlus"),
    ("14:ab:c5", "OnePlus"),
    ("94:87:e0", "Xiaomi"),
    ("f8:a2:d6", "Xiaomi"),
    ("50:64:2b", "Xiaomi"),
    ("00:26:b9", "Sony"),
    ("30:17:c8", "Sony"),
    ("10:68:3f", "Huawei"),
    ("48:00:31", "Huawei"),
    ("00:1c:bf", "Realtek"),
    ("00:0f:b5", "Netgear"),
    ("c8:3a:35", "Tenda"),
    ("18:a6:f7", "TP-Link"),
    ("f4:f2:6d", "TP-Link"),
    ("00:1d:0f", "Asus"),
    ("04:92:26", "Asus"),
    ("b8:27:eb", "Raspberry Pi"),
    ("dc:a6:32", "Raspberry Pi"),
    ("e4:5f:01", "Raspberry Pi"),
];

/// Look up the vendor for an address, if its OUI is known.
pub fn vendor(mac: &MacAddress) -> Option<&'static str> {
    let prefix = mac.oui_prefix();
    OUI_TABLE
        .iter()
        .find(|(oui, _)| *oui == prefix)
        .map(|(_, name)| *name)
}

pub fn vendor_or_unknown(mac: &MacAddress) -> &'static str {
    vendor(mac).unwrap_or(UNKNOWN_VENDOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_prefix_resolves() {
        let mac: MacAddress = "B8:27:EB:12:34:56".parse().unwrap();
        assert_eq!(vendor(&mac), Some("Raspberry Pi"));
    }

    #[test]
    fn unknown_prefix_falls_back() {
        let mac: MacAddress = "02:00:00:aa:bb:cc".parse().unwrap();
        assert_eq!(vendor(&mac), None);
        assert_eq!(vendor_or_unknown(&mac), UNKNOWN_VENDOR);
    }
}
