//! Wireless-security operations over the aircrack-ng suite.
//!
//! This crate does not speak any wireless protocol itself. It supervises
//! the external tools that do (airmon-ng, airodump-ng, aireplay-ng,
//! aircrack-ng, hcxpcapngtool), streams their output as typed events, and
//! keeps a live picture of nearby networks by polling the CSV sidecar file
//! airodump-ng writes during a scan.

pub mod band;
pub mod capture;
pub mod command;
pub mod crack;
pub mod deauth;
pub mod error;
pub mod events;
pub mod interface;
pub mod scan;
pub mod sidecar;
pub mod supervisor;

pub use band::Band;
pub use error::{Result, WirelessError};
pub use events::{channel, EventReceiver, EventSender, ProcessEvent, ScanEvent, SessionEvent};
pub use scan::{Client, Network, ScanIngestor};
pub use supervisor::{ProcessSupervisor, SupervisedChild};

/// Root is required for everything that touches the radio.
pub fn check_privileges() -> bool {
    nix::unistd::geteuid().is_root()
}
