use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use netshade_wireless::Band;

#[derive(Parser, Debug)]
#[command(
    name = "netshade",
    version,
    about = "Wi-Fi security testing toolkit over the aircrack-ng suite"
)]
pub struct Cli {
    /// Enable debug output (same as NETSHADE_LOG=debug)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List wireless interfaces with their mode and driver
    Interfaces,

    /// Monitor-mode control for a wireless card
    #[command(subcommand)]
    Monitor(MonitorCommand),

    /// Live scan for access points and associated clients
    Scan {
        /// Monitor-mode interface to scan with; auto-detected when omitted
        #[arg(long, short)]
        interface: Option<String>,

        /// Frequency band to sweep (bg or a)
        #[arg(long, default_value = "bg")]
        band: Band,

        /// Stop automatically after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Capture the WPA handshake of one access point
    Capture {
        /// Target access point
        #[arg(long)]
        bssid: String,

        /// Channel the access point is on
        #[arg(long, short)]
        channel: i32,

        /// Name for the capture files
        #[arg(long)]
        name: String,

        #[arg(long, short)]
        interface: String,
    },

    /// Deauthenticate clients from an access point
    Deauth {
        /// Target access point
        #[arg(long)]
        bssid: String,

        /// Single station to target; omit to hit all clients
        #[arg(long)]
        client: Option<String>,

        /// Pin the card to this channel before starting
        #[arg(long, short)]
        channel: Option<i32>,

        #[arg(long, short)]
        interface: String,
    },

    /// Run a dictionary attack against a captured handshake
    Crack {
        /// Capture file (.cap)
        #[arg(long)]
        cap: PathBuf,

        /// Wordlist; defaults to NETSHADE_WORDLIST or rockyou
        #[arg(long, short)]
        wordlist: Option<PathBuf>,
    },

    /// Convert a capture for use with another cracker
    Convert {
        /// Capture file (.cap)
        #[arg(long)]
        cap: PathBuf,

        #[arg(long, value_enum)]
        format: ConvertFormat,

        /// Output directory; defaults to the captured directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum MonitorCommand {
    /// Put a card into monitor mode (airmon-ng start)
    Enable { interface: String },
    /// Return a card to managed mode (airmon-ng stop)
    Disable { interface: String },
    /// Kill interfering processes (airmon-ng check kill)
    Kill,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ConvertFormat {
    /// hashcat hc22000
    Hashcat,
    /// John the Ripper hccap
    John,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scan_invocation() {
        let cli = Cli::try_parse_from([
            "netshade", "scan", "--interface", "wlan0mon", "--band", "a",
        ])
        .unwrap();
        match cli.command {
            Command::Scan {
                interface, band, ..
            } => {
                assert_eq!(interface.as_deref(), Some("wlan0mon"));
                assert_eq!(band, Band::A);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn band_defaults_to_bg() {
        let cli =
            Cli::try_parse_from(["netshade", "scan", "--interface", "wlan0mon"]).unwrap();
        match cli.command {
            Command::Scan { band, .. } => assert_eq!(band, Band::Bg),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_band() {
        assert!(Cli::try_parse_from([
            "netshade", "scan", "--interface", "wlan0mon", "--band", "c",
        ])
        .is_err());
    }
}
