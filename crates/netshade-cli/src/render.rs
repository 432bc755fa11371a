//! Terminal rendering. Every function takes the theme explicitly.

use chrono::Local;
use colored::{Color, Colorize};

use netshade_wireless::scan::{Client, Network};
use netshade_wireless::{ScanEvent, SessionEvent};

use crate::theme::Theme;

fn stamped(theme: &Theme, color: Color, text: &str) {
    let ts = Local::now().format("%H:%M:%S");
    println!(
        "{} {}",
        format!("[{ts}]").color(theme.timestamp),
        text.color(color)
    );
}

pub fn info(theme: &Theme, text: &str) {
    stamped(theme, theme.info, text);
}

pub fn success(theme: &Theme, text: &str) {
    stamped(theme, theme.success, text);
}

pub fn warning(theme: &Theme, text: &str) {
    stamped(theme, theme.warning, text);
}

pub fn error(theme: &Theme, text: &str) {
    stamped(theme, theme.error, text);
}

pub fn raw(theme: &Theme, text: &str) {
    stamped(theme, theme.raw, text);
}

pub fn scan_event(theme: &Theme, event: &ScanEvent) {
    match event {
        ScanEvent::NetworkFound(network) => stamped(
            theme,
            theme.accent,
            &format!(
                "+ network {} {} ch {} ({}) {} {} dBm",
                network.first_seen,
                network.bssid,
                network.channel,
                network.band(),
                network.ssid,
                network.power
            ),
        ),
        ScanEvent::NetworkUpdated(network) => stamped(
            theme,
            theme.info,
            &format!(
                "~ network {} {} {} dBm",
                network.bssid, network.ssid, network.power
            ),
        ),
        ScanEvent::ClientFound(client) => stamped(
            theme,
            theme.success,
            &format!(
                "+ client {} ({}) -> {} {} dBm",
                client.station, client.vendor, client.bssid, client.power
            ),
        ),
        ScanEvent::ClientUpdated(client) => stamped(
            theme,
            theme.info,
            &format!(
                "~ client {} -> {} {} dBm",
                client.station, client.bssid, client.power
            ),
        ),
        // Raw airodump terminal refreshes are noise at info level.
        ScanEvent::CaptureLine(_) => {}
        ScanEvent::CaptureExited { code } => match code {
            Some(0) => info(theme, "capture process finished"),
            other => warning(theme, &format!("capture process exited with {other:?}")),
        },
    }
}

pub fn session_event(theme: &Theme, event: &SessionEvent) {
    match event {
        SessionEvent::Line(line) => raw(theme, line),
        SessionEvent::HandshakeCaptured { bssid } => {
            success(theme, &format!("Handshake captured from {bssid}"));
        }
        SessionEvent::KeyFound { key } => {
            success(theme, &format!("KEY FOUND: {key}"));
        }
        SessionEvent::Completed { code } => match code {
            Some(0) => success(theme, "Command completed"),
            other => warning(theme, &format!("Command exited with {other:?}")),
        },
        SessionEvent::Failed { reason } => error(theme, reason),
    }
}

/// Final scan table: networks in discovery order, clients nested under
/// their access point.
pub fn scan_summary(theme: &Theme, networks: &[Network], clients: &[Client]) {
    println!();
    println!(
        "{}",
        format!(
            "{:>3}  {:<17}  {:<24}  {:>5}  {:>3}  {:<10}  {}",
            "#", "BSSID", "SSID", "PWR", "CH", "SECURITY", "CLIENTS"
        )
        .color(theme.accent)
    );

    for network in networks {
        let attached: Vec<&Client> = clients
            .iter()
            .filter(|c| c.bssid == network.bssid)
            .collect();
        println!(
            "{:>3}  {:<17}  {:<24}  {}  {:>3}  {:<10}  {}",
            network.first_seen,
            network.bssid.to_string(),
            network.ssid,
            format!("{:>5}", network.power).color(theme.signal_color(network.power)),
            network.channel,
            network.privacy,
            attached.len()
        );
        for client in attached {
            println!(
                "     {}  {:<24}  {}",
                format!("`- {}", client.station).color(theme.success),
                client.vendor,
                format!("{:>5}", client.power).color(theme.signal_color(client.power)),
            );
        }
    }

    println!();
    println!(
        "{} networks, {} clients",
        networks.len().to_string().color(theme.accent),
        clients.len().to_string().color(theme.accent)
    );
}
