//! Hardware (MAC) addresses.
//!
//! Every address that enters the system, whether parsed out of a sidecar
//! row or typed by the user, goes through [`MacAddress::from_str`] so the
//! rest of the code only ever sees validated addresses.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid hardware address '{input}': {reason}")]
pub struct MacParseError {
    pub input: String,
    pub reason: &'static str,
}

/// A 48-bit hardware address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Broadcast address (FF:FF:FF:FF:FF:FF).
    pub const BROADCAST: MacAddress = MacAddress([0xFF; 6]);

    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xFF; 6]
    }

    /// First three octets, lowercase, as used for vendor lookup.
    pub fn oui_prefix(&self) -> String {
        format!("{:02x}:{:02x}:{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({})", self)
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(MacParseError {
                input: s.to_string(),
                reason: "expected six colon-separated octets",
            });
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 {
                return Err(MacParseError {
                    input: s.to_string(),
                    reason: "octet must be exactly two hex digits",
                });
            }
            bytes[i] = u8::from_str_radix(part, 16).map_err(|_| MacParseError {
                input: s.to_string(),
                reason: "octet is not valid hex",
            })?;
        }

        Ok(Self(bytes))
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_round_trips() {
        let mac: MacAddress = "aa:bb:cc:00:11:22".parse().unwrap();
        assert_eq!(mac.to_string(), "AA:BB:CC:00:11:22");
        assert_eq!(mac.to_string().parse::<MacAddress>().unwrap(), mac);
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in [
            "",
            "aa:bb:cc:00:11",
            "aa:bb:cc:00:11:22:33",
            "aa-bb-cc-00-11-22",
            "gg:bb:cc:00:11:22",
            "aaa:bb:cc:00:11:2",
            "(not associated)",
        ] {
            assert!(bad.parse::<MacAddress>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn oui_prefix_is_lowercase() {
        let mac: MacAddress = "B8:27:EB:12:34:56".parse().unwrap();
        assert_eq!(mac.oui_prefix(), "b8:27:eb");
    }

    #[test]
    fn serde_uses_string_form() {
        let mac: MacAddress = "de:ad:be:ef:00:01".parse().unwrap();
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"DE:AD:BE:EF:00:01\"");
        let back: MacAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mac);
    }

    #[test]
    fn broadcast_detection() {
        assert!(MacAddress::BROADCAST.is_broadcast());
        let mac: MacAddress = "aa:bb:cc:00:11:22".parse().unwrap();
        assert!(!mac.is_broadcast());
    }
}
