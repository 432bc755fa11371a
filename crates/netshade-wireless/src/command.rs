//! Typed builders for every external command line this crate invokes.
//!
//! Keeping the argv construction in one place means the supervisor and the
//! sessions never concatenate strings ad hoc, and the exact shape of each
//! invocation is unit-testable.

use std::fmt;
use std::path::Path;
use std::process::Command;

use netshade_core::MacAddress;

use crate::band::Band;
use crate::error::{Result, WirelessError};

/// A fully-specified external command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Probe `$PATH` for an external tool.
pub fn is_tool_available(name: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| dir.join(name).is_file())
}

/// Fail before spawning when a required tool is absent.
pub fn require_tool(name: &str) -> Result<()> {
    if is_tool_available(name) {
        Ok(())
    } else {
        Err(WirelessError::Tool(name.to_string()))
    }
}

pub fn airmon_start(interface: &str) -> ToolCommand {
    ToolCommand::new("airmon-ng").arg("start").arg(interface)
}

pub fn airmon_stop(interface: &str) -> ToolCommand {
    ToolCommand::new("airmon-ng").arg("stop").arg(interface)
}

pub fn airmon_check_kill() -> ToolCommand {
    ToolCommand::new("airmon-ng").arg("check").arg("kill")
}

/// Continuous band-wide scan writing the CSV sidecar next to `prefix`.
pub fn airodump_scan(prefix: &Path, band: Band, interface: &str) -> ToolCommand {
    ToolCommand::new("airodump-ng")
        .arg("--output-format")
        .arg("csv")
        .arg("--write")
        .arg(prefix.to_string_lossy())
        .arg("--band")
        .arg(band.flag_value())
        .arg(interface)
}

/// Targeted capture of a single access point, written to `prefix` as a
/// `.cap` for later offline work.
pub fn airodump_capture(
    bssid: MacAddress,
    channel: i32,
    prefix: &Path,
    interface: &str,
) -> ToolCommand {
    ToolCommand::new("airodump-ng")
        .arg("--bssid")
        .arg(bssid.to_string())
        .arg("-c")
        .arg(channel.to_string())
        .arg("-w")
        .arg(prefix.to_string_lossy())
        .arg(interface)
}

/// Continuous deauthentication, broadcast or aimed at one station.
pub fn aireplay_deauth(
    bssid: MacAddress,
    station: Option<MacAddress>,
    interface: &str,
) -> ToolCommand {
    let mut cmd = ToolCommand::new("aireplay-ng")
        .arg("--deauth")
        .arg("0")
        .arg("-a")
        .arg(bssid.to_string());
    if let Some(station) = station {
        cmd = cmd.arg("-c").arg(station.to_string());
    }
    cmd.arg(interface)
}

pub fn aircrack_wordlist(cap: &Path, wordlist: &Path) -> ToolCommand {
    ToolCommand::new("aircrack-ng")
        .arg(cap.to_string_lossy())
        .arg("-w")
        .arg(wordlist.to_string_lossy())
}

/// Export a capture in John the Ripper's hccap format.
pub fn aircrack_export_john(cap: &Path, out_prefix: &Path) -> ToolCommand {
    ToolCommand::new("aircrack-ng")
        .arg(cap.to_string_lossy())
        .arg("-J")
        .arg(out_prefix.to_string_lossy())
}

/// Convert a capture to hashcat's hc22000 format.
pub fn hcx_convert(cap: &Path, out: &Path) -> ToolCommand {
    ToolCommand::new("hcxpcapngtool")
        .arg("-o")
        .arg(out.to_string_lossy())
        .arg(cap.to_string_lossy())
}

pub fn ethtool_driver(interface: &str) -> ToolCommand {
    ToolCommand::new("ethtool").arg("-i").arg(interface)
}

pub fn iw_dev() -> ToolCommand {
    ToolCommand::new("iw").arg("dev")
}

pub fn iwconfig(interface: Option<&str>) -> ToolCommand {
    let cmd = ToolCommand::new("iwconfig");
    match interface {
        Some(iface) => cmd.arg(iface),
        None => cmd,
    }
}

pub fn iwconfig_set_channel(interface: &str, channel: i32) -> ToolCommand {
    ToolCommand::new("iwconfig")
        .arg(interface)
        .arg("channel")
        .arg(channel.to_string())
}
