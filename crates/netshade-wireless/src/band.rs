use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WirelessError;

/// Frequency band selector handed to airodump-ng via `--band`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    /// 2.4 GHz (channels 1-14).
    Bg,
    /// 5 GHz (channels above 14).
    A,
}

impl Band {
    /// Classify a channel number. Anything above 14 is the higher band;
    /// a plain numeric threshold, not a channel table.
    pub fn of_channel(channel: i32) -> Band {
        if channel > 14 {
            Band::A
        } else {
            Band::Bg
        }
    }

    /// Value passed to `airodump-ng --band`.
    pub fn flag_value(&self) -> &'static str {
        match self {
            Band::Bg => "bg",
            Band::A => "a",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Bg => write!(f, "2.4GHz"),
            Band::A => write!(f, "5GHz"),
        }
    }
}

impl FromStr for Band {
    type Err = WirelessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bg" | "2.4" | "2.4ghz" => Ok(Band::Bg),
            "a" | "5" | "5ghz" => Ok(Band::A),
            other => Err(WirelessError::System(format!("unknown band '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_threshold() {
        assert_eq!(Band::of_channel(1), Band::Bg);
        assert_eq!(Band::of_channel(6), Band::Bg);
        assert_eq!(Band::of_channel(14), Band::Bg);
        assert_eq!(Band::of_channel(36), Band::A);
        assert_eq!(Band::of_channel(149), Band::A);
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("bg".parse::<Band>().unwrap(), Band::Bg);
        assert_eq!("5ghz".parse::<Band>().unwrap(), Band::A);
        assert!("x".parse::<Band>().is_err());
    }
}
