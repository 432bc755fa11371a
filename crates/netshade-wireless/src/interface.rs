//! Wireless interface inspection and monitor-mode control.
//!
//! Everything here shells out: iwconfig and iw for discovery, ethtool for
//! driver details, airmon-ng for mode changes. Mode changes mutate host
//! interface state; that is the point of the wrapper, not a tested
//! property.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use netshade_core::CancelFlag;

use crate::command::{self, ToolCommand};
use crate::error::{Result, WirelessError};
use crate::events::ProcessEvent;
use crate::supervisor::ProcessSupervisor;

static IWCONFIG_IFACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(\w+)\s+IEEE").expect("interface pattern"));
static ETHTOOL_DRIVER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"driver:\s+(\S+)").expect("driver pattern"));
static IW_DEV_IFACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*Interface\s+(\S+)").expect("iw pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceMode {
    Managed,
    Monitor,
}

impl InterfaceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceMode::Managed => "Managed",
            InterfaceMode::Monitor => "Monitor",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    pub name: String,
    pub mode: InterfaceMode,
    pub driver: Option<String>,
}

/// Wireless interfaces as reported by iwconfig.
pub fn detect_interfaces() -> Result<Vec<String>> {
    let output = run_capture(command::iwconfig(None))?;
    Ok(parse_iwconfig_interfaces(&output))
}

pub fn parse_iwconfig_interfaces(output: &str) -> Vec<String> {
    IWCONFIG_IFACE
        .captures_iter(output)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// First monitor-mode interface if one exists, else the first wireless
/// interface.
pub fn preferred_interface() -> Result<Option<String>> {
    let interfaces = detect_interfaces()?;
    Ok(interfaces
        .iter()
        .find(|name| name.contains("mon"))
        .cloned()
        .or_else(|| interfaces.into_iter().next()))
}

pub fn interface_mode(interface: &str) -> Result<InterfaceMode> {
    let output = run_capture(command::iwconfig(Some(interface)))?;
    if output.trim().is_empty() {
        return Err(WirelessError::interface(format!(
            "no such interface: {interface}"
        )));
    }
    Ok(parse_mode(&output))
}

pub fn parse_mode(output: &str) -> InterfaceMode {
    if output.contains("Monitor") {
        InterfaceMode::Monitor
    } else {
        InterfaceMode::Managed
    }
}

/// Conventional monitor-interface name for a card.
pub fn monitor_name(interface: &str) -> String {
    if interface.contains("mon") {
        interface.to_string()
    } else {
        format!("{interface}mon")
    }
}

pub fn driver_info(interface: &str) -> Result<Option<String>> {
    let output = run_capture(command::ethtool_driver(interface))?;
    Ok(parse_driver(&output))
}

pub fn parse_driver(output: &str) -> Option<String> {
    ETHTOOL_DRIVER
        .captures(output)
        .map(|caps| caps[1].to_string())
}

/// Interfaces known to the nl80211 layer, via `iw dev`.
pub fn phy_interfaces() -> Result<Vec<String>> {
    let output = run_capture(command::iw_dev())?;
    Ok(parse_iw_dev(&output))
}

pub fn parse_iw_dev(output: &str) -> Vec<String> {
    IW_DEV_IFACE
        .captures_iter(output)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Mode and driver for every wireless interface on the host.
pub fn describe_all() -> Result<Vec<InterfaceInfo>> {
    let mut infos = Vec::new();
    for name in detect_interfaces()? {
        let mode = interface_mode(&name).unwrap_or(InterfaceMode::Managed);
        let driver = driver_info(&name).unwrap_or(None);
        infos.push(InterfaceInfo { name, mode, driver });
    }
    Ok(infos)
}

/// Put a card into monitor mode via airmon-ng, streaming tool output.
pub fn enable_monitor<F>(
    supervisor: &ProcessSupervisor,
    interface: &str,
    cancel: Option<&CancelFlag>,
    on_event: F,
) -> Result<Option<i32>>
where
    F: Fn(ProcessEvent) + Send + Sync + 'static,
{
    command::require_tool("airmon-ng")?;
    supervisor.run(command::airmon_start(interface), cancel, on_event)
}

pub fn disable_monitor<F>(
    supervisor: &ProcessSupervisor,
    interface: &str,
    cancel: Option<&CancelFlag>,
    on_event: F,
) -> Result<Option<i32>>
where
    F: Fn(ProcessEvent) + Send + Sync + 'static,
{
    command::require_tool("airmon-ng")?;
    supervisor.run(command::airmon_stop(interface), cancel, on_event)
}

/// Kill NetworkManager, wpa_supplicant, and friends before capturing.
pub fn kill_interfering<F>(
    supervisor: &ProcessSupervisor,
    cancel: Option<&CancelFlag>,
    on_event: F,
) -> Result<Option<i32>>
where
    F: Fn(ProcessEvent) + Send + Sync + 'static,
{
    command::require_tool("airmon-ng")?;
    supervisor.run(command::airmon_check_kill(), cancel, on_event)
}

/// Run a command to completion, returning merged stdout+stderr. iwconfig
/// reports wireless extensions on stderr for some interfaces, so both
/// streams matter.
fn run_capture(cmd: ToolCommand) -> Result<String> {
    debug!("running {}", cmd);
    let output = cmd
        .to_command()
        .output()
        .map_err(|source| WirelessError::Spawn {
            command: cmd.to_string(),
            source,
        })?;
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(text)
}
