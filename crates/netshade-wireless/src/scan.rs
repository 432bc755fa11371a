//! Live scan ingestion.
//!
//! [`ScanIngestor`] runs a continuous airodump-ng capture under the process
//! supervisor and polls the CSV sidecar it writes on a fixed interval. Rows
//! are merged into an in-memory map of networks and clients; a change
//! notification is published only when a record is new or materially
//! different, so an unchanged file produces no event traffic at all.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use netshade_core::{cancel_sleep, new_cancel_flag, oui, CancelFlag, Config, MacAddress};

use crate::band::Band;
use crate::command;
use crate::error::Result;
use crate::events::{EventSender, ProcessEvent, ScanEvent};
use crate::sidecar::{self, SidecarReport};
use crate::supervisor::{lock_ignore_poison, ProcessSupervisor, SupervisedChild};

/// A discovered access point. Mutated in place as newer rows arrive and
/// kept until the ingestor is reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Network {
    pub bssid: MacAddress,
    pub ssid: String,
    pub channel: i32,
    pub power: i32,
    pub privacy: String,
    /// Discovery order, starting at 1 for the first network seen.
    pub first_seen: u64,
}

impl Network {
    pub fn band(&self) -> Band {
        Band::of_channel(self.channel)
    }
}

/// A station associated to a known access point. Identified by the
/// `(station, bssid)` pair; the network relationship is by key lookup,
/// not embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    pub station: MacAddress,
    pub bssid: MacAddress,
    pub power: i32,
    pub vendor: String,
}

/// Shared scan state, guarded by one mutex around each merge pass.
#[derive(Debug, Default)]
pub struct ScanState {
    networks: HashMap<MacAddress, Network>,
    clients: HashMap<(MacAddress, MacAddress), Client>,
    next_seq: u64,
}

impl ScanState {
    /// Merge one parsed sidecar report, publishing found/updated events
    /// for records that are new or materially changed.
    pub fn apply_report(&mut self, report: &SidecarReport, events: &EventSender<ScanEvent>) {
        for row in &report.networks {
            match self.networks.get_mut(&row.bssid) {
                Some(network) => {
                    let changed = network.ssid != row.ssid
                        || network.channel != row.channel
                        || network.power != row.power
                        || network.privacy != row.privacy;
                    if changed {
                        network.ssid = row.ssid.clone();
                        network.channel = row.channel;
                        network.power = row.power;
                        network.privacy = row.privacy.clone();
                        events.send(ScanEvent::NetworkUpdated(network.clone()));
                    }
                }
                None => {
                    self.next_seq += 1;
                    let network = Network {
                        bssid: row.bssid,
                        ssid: row.ssid.clone(),
                        channel: row.channel,
                        power: row.power,
                        privacy: row.privacy.clone(),
                        first_seen: self.next_seq,
                    };
                    self.networks.insert(row.bssid, network.clone());
                    events.send(ScanEvent::NetworkFound(network));
                }
            }
        }

        for row in &report.stations {
            // Stations without a known access point are dropped; the next
            // sidecar rewrite re-offers the pair once the AP row exists.
            let Some(bssid) = row.bssid else {
                continue;
            };
            if !self.networks.contains_key(&bssid) {
                continue;
            }

            let key = (row.station, bssid);
            match self.clients.get_mut(&key) {
                Some(client) => {
                    if client.power != row.power {
                        client.power = row.power;
                        events.send(ScanEvent::ClientUpdated(client.clone()));
                    }
                }
                None => {
                    let client = Client {
                        station: row.station,
                        bssid,
                        power: row.power,
                        vendor: oui::vendor_or_unknown(&row.station).to_string(),
                    };
                    self.clients.insert(key, client.clone());
                    events.send(ScanEvent::ClientFound(client));
                }
            }
        }
    }

    /// Networks in discovery order.
    pub fn networks(&self) -> Vec<Network> {
        let mut networks: Vec<Network> = self.networks.values().cloned().collect();
        networks.sort_by_key(|n| n.first_seen);
        networks
    }

    pub fn clients(&self) -> Vec<Client> {
        let mut clients: Vec<Client> = self.clients.values().cloned().collect();
        clients.sort_by_key(|c| (c.bssid, c.station));
        clients
    }

    pub fn clients_of(&self, bssid: MacAddress) -> Vec<Client> {
        let mut clients: Vec<Client> = self
            .clients
            .values()
            .filter(|c| c.bssid == bssid)
            .cloned()
            .collect();
        clients.sort_by_key(|c| c.station);
        clients
    }

    pub fn clear(&mut self) {
        self.networks.clear();
        self.clients.clear();
        self.next_seq = 0;
    }
}

struct ActiveScan {
    child: SupervisedChild,
    cancel: CancelFlag,
    poll_thread: JoinHandle<()>,
}

/// Runs the capture process and the sidecar poll loop for one scan at a
/// time. Starting while a scan is active stops the previous one first.
pub struct ScanIngestor {
    config: Config,
    supervisor: ProcessSupervisor,
    events: EventSender<ScanEvent>,
    state: Arc<Mutex<ScanState>>,
    active: Option<ActiveScan>,
}

impl ScanIngestor {
    pub fn new(config: Config, events: EventSender<ScanEvent>) -> Self {
        let supervisor = ProcessSupervisor::new(config.stop_timeout);
        Self {
            config,
            supervisor,
            events,
            state: Arc::new(Mutex::new(ScanState::default())),
            active: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Launch the capture process and the poll loop.
    pub fn start(&mut self, interface: &str, band: Band) -> Result<()> {
        command::require_tool("airodump-ng")?;
        if self.active.is_some() {
            self.stop()?;
        }

        self.config.ensure_dirs()?;
        let prefix = self.config.scan_prefix();
        remove_artifacts(&prefix);

        let tx = self.events.clone();
        let child = self.supervisor.spawn(
            command::airodump_scan(&prefix, band, interface),
            move |event| match event {
                ProcessEvent::Line(line) => tx.send(ScanEvent::CaptureLine(line)),
                ProcessEvent::Exited { code } => tx.send(ScanEvent::CaptureExited { code }),
            },
        )?;

        let cancel = new_cancel_flag();
        let poll_thread = spawn_poll_loop(
            sidecar_path(&prefix),
            self.config.poll_interval,
            Arc::clone(&self.state),
            self.events.clone(),
            Arc::clone(&cancel),
        );

        info!("scan started on {} ({})", interface, band);
        self.active = Some(ActiveScan {
            child,
            cancel,
            poll_thread,
        });
        Ok(())
    }

    /// Stop the capture, join the poll loop, and delete the sidecar file
    /// and its capture artifact. Safe to call when no scan is active.
    pub fn stop(&mut self) -> Result<()> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };

        active.cancel.store(true, Ordering::Relaxed);
        active.child.stop()?;
        let _ = active.poll_thread.join();
        remove_artifacts(&self.config.scan_prefix());
        info!("scan stopped");
        Ok(())
    }

    /// Current picture: networks in discovery order plus all clients.
    pub fn snapshot(&self) -> (Vec<Network>, Vec<Client>) {
        let state = lock_ignore_poison(&self.state);
        (state.networks(), state.clients())
    }

    /// Forget everything seen so far. Discovery numbering restarts at 1.
    pub fn reset(&self) {
        lock_ignore_poison(&self.state).clear();
    }
}

impl Drop for ScanIngestor {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// airodump-ng appends a run counter to the prefix; the artifacts are
/// removed on start, so the counter is always `01`.
fn sidecar_path(prefix: &Path) -> PathBuf {
    artifact_path(prefix, "csv")
}

fn artifact_path(prefix: &Path, extension: &str) -> PathBuf {
    let mut name = prefix
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str("-01.");
    name.push_str(extension);
    prefix.with_file_name(name)
}

fn remove_artifacts(prefix: &Path) {
    for extension in ["csv", "cap"] {
        let path = artifact_path(prefix, extension);
        match fs::remove_file(&path) {
            Ok(()) => debug!("removed {}", path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("could not remove {}: {}", path.display(), err),
        }
    }
}

fn spawn_poll_loop(
    csv_path: PathBuf,
    interval: Duration,
    state: Arc<Mutex<ScanState>>,
    events: EventSender<ScanEvent>,
    cancel: CancelFlag,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        if cancel_sleep(Some(&cancel), interval).is_err() {
            break;
        }

        let content = match fs::read(&csv_path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("sidecar not written yet, retrying");
                continue;
            }
            Err(err) => {
                warn!("sidecar read failed: {}", err);
                continue;
            }
        };

        let report = sidecar::parse(&content);
        lock_ignore_poison(&state).apply_report(&report, &events);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::channel;
    use crate::sidecar::{NetworkRow, StationRow};

    fn network_row(bssid: &str, power: i32) -> NetworkRow {
        NetworkRow {
            bssid: bssid.parse().unwrap(),
            ssid: "Net".to_string(),
            channel: 6,
            power,
            privacy: "WPA2".to_string(),
        }
    }

    fn station_row(station: &str, bssid: Option<&str>, power: i32) -> StationRow {
        StationRow {
            station: station.parse().unwrap(),
            power,
            bssid: bssid.map(|b| b.parse().unwrap()),
        }
    }

    #[test]
    fn reapplying_an_unchanged_report_is_silent() {
        let (tx, rx) = channel();
        let mut state = ScanState::default();
        let report = SidecarReport {
            networks: vec![network_row("AA:BB:CC:DD:EE:01", -50)],
            stations: vec![station_row("11:22:33:44:55:66", Some("AA:BB:CC:DD:EE:01"), -60)],
        };

        state.apply_report(&report, &tx);
        assert_eq!(rx.drain().len(), 2);

        state.apply_report(&report, &tx);
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn power_change_emits_a_single_update() {
        let (tx, rx) = channel();
        let mut state = ScanState::default();

        let first = SidecarReport {
            networks: vec![network_row("AA:BB:CC:DD:EE:01", -50)],
            stations: vec![station_row("11:22:33:44:55:66", Some("AA:BB:CC:DD:EE:01"), -100)],
        };
        state.apply_report(&first, &tx);
        rx.drain();

        let second = SidecarReport {
            networks: vec![network_row("AA:BB:CC:DD:EE:01", -50)],
            stations: vec![station_row("11:22:33:44:55:66", Some("AA:BB:CC:DD:EE:01"), -40)],
        };
        state.apply_report(&second, &tx);

        let events = rx.drain();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ScanEvent::ClientUpdated(client) => assert_eq!(client.power, -40),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn orphan_station_never_surfaces() {
        let (tx, rx) = channel();
        let mut state = ScanState::default();
        let report = SidecarReport {
            networks: Vec::new(),
            stations: vec![
                station_row("11:22:33:44:55:66", Some("AA:BB:CC:DD:EE:99"), -60),
                station_row("11:22:33:44:55:77", None, -60),
            ],
        };

        state.apply_report(&report, &tx);
        assert!(rx.drain().is_empty());
        assert!(state.clients().is_empty());
    }

    #[test]
    fn first_seen_preserves_discovery_order() {
        let (tx, _rx) = channel();
        let mut state = ScanState::default();

        state.apply_report(
            &SidecarReport {
                networks: vec![network_row("AA:BB:CC:DD:EE:01", -50)],
                stations: Vec::new(),
            },
            &tx,
        );
        state.apply_report(
            &SidecarReport {
                networks: vec![
                    network_row("AA:BB:CC:DD:EE:02", -70),
                    network_row("AA:BB:CC:DD:EE:01", -50),
                ],
                stations: Vec::new(),
            },
            &tx,
        );

        let networks = state.networks();
        assert_eq!(networks[0].bssid.to_string(), "AA:BB:CC:DD:EE:01");
        assert_eq!(networks[0].first_seen, 1);
        assert_eq!(networks[1].bssid.to_string(), "AA:BB:CC:DD:EE:02");
        assert_eq!(networks[1].first_seen, 2);
    }

    #[test]
    fn reset_clears_state_and_numbering() {
        let (tx, _rx) = channel();
        let mut state = ScanState::default();
        state.apply_report(
            &SidecarReport {
                networks: vec![network_row("AA:BB:CC:DD:EE:01", -50)],
                stations: Vec::new(),
            },
            &tx,
        );
        state.clear();
        assert!(state.networks().is_empty());

        state.apply_report(
            &SidecarReport {
                networks: vec![network_row("AA:BB:CC:DD:EE:02", -70)],
                stations: Vec::new(),
            },
            &tx,
        );
        assert_eq!(state.networks()[0].first_seen, 1);
    }

    #[test]
    fn remove_artifacts_deletes_csv_and_cap() {
        let tmp = tempfile::tempdir().unwrap();
        let prefix = tmp.path().join("scan");
        let csv = tmp.path().join("scan-01.csv");
        let cap = tmp.path().join("scan-01.cap");
        fs::write(&csv, "x").unwrap();
        fs::write(&cap, "x").unwrap();

        remove_artifacts(&prefix);
        assert!(!csv.exists());
        assert!(!cap.exists());

        // Missing artifacts are not an error.
        remove_artifacts(&prefix);
    }

    #[test]
    fn artifact_paths_follow_the_run_counter() {
        let prefix = PathBuf::from("/tmp/netshade/scan");
        assert_eq!(
            sidecar_path(&prefix),
            PathBuf::from("/tmp/netshade/scan-01.csv")
        );
        assert_eq!(
            artifact_path(&prefix, "cap"),
            PathBuf::from("/tmp/netshade/scan-01.cap")
        );
    }
}
