//! Terminal theme.
//!
//! One immutable value constructed at startup and passed by reference to
//! every rendering function; nothing mutates colors at runtime.

use colored::Color;

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub info: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub raw: Color,
    pub accent: Color,
    pub timestamp: Color,
    /// Signal at or above this is rendered as strong.
    pub strong_signal_dbm: i32,
    /// Signal at or above this (but below strong) is rendered as fair.
    pub fair_signal_dbm: i32,
}

impl Theme {
    pub const fn dark() -> Self {
        Self {
            info: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            raw: Color::BrightBlack,
            accent: Color::Magenta,
            timestamp: Color::BrightBlack,
            strong_signal_dbm: -50,
            fair_signal_dbm: -70,
        }
    }

    /// Color for a signal-power reading in dBm.
    pub fn signal_color(&self, power: i32) -> Color {
        if power > self.strong_signal_dbm {
            self.success
        } else if power > self.fair_signal_dbm {
            self.warning
        } else {
            self.error
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}
