//! End-to-end ingest pipeline: sidecar text in, change events out.
//!
//! Drives the same parse-and-merge path the poll loop runs, using sidecar
//! snapshots the way airodump-ng rewrites them between polls.

use netshade_wireless::scan::ScanState;
use netshade_wireless::sidecar;
use netshade_wireless::{channel, ScanEvent};

const AP_HEADER: &str =
    "BSSID, First time seen, Last time seen, channel, Speed, Privacy, Cipher, Authentication, \
     Power, # beacons, # IV, LAN IP, ID-length, ESSID, Key";
const STATION_HEADER: &str =
    "Station MAC, First time seen, Last time seen, Power, # packets, BSSID, Probed ESSIDs";

fn sidecar_file(ap_rows: &[&str], station_rows: &[&str]) -> String {
    let mut sections = vec!["header".to_string(), AP_HEADER.to_string()];
    sections.extend(ap_rows.iter().map(|r| r.to_string()));
    let mut stations = vec!["header".to_string(), STATION_HEADER.to_string()];
    stations.extend(station_rows.iter().map(|r| r.to_string()));
    format!(
        "{}\r\n\r\n{}\r\n",
        sections.join("\r\n"),
        stations.join("\r\n")
    )
}

const AP_HOME: &str = "AA:BB:CC:DD:EE:01, 2024-01-01 10:00:00, 2024-01-01 10:00:05, 6, 54, \
                       WPA2, CCMP, PSK, -47, 12, 0, 0.0.0.0, 7, HomeNet, ";
const AP_HOME_WEAKER: &str = "AA:BB:CC:DD:EE:01, 2024-01-01 10:00:00, 2024-01-01 10:00:07, 6, 54, \
                              WPA2, CCMP, PSK, -63, 14, 0, 0.0.0.0, 7, HomeNet, ";
const AP_LAB: &str = "AA:BB:CC:DD:EE:02, 2024-01-01 10:00:01, 2024-01-01 10:00:06, 149, 866, \
                      WPA2, CCMP, PSK, -71, 4, 0, 0.0.0.0, 3, Lab, ";
const STA_PHONE_COLD: &str = "B8:27:EB:44:55:66, 2024-01-01 10:00:02, 2024-01-01 10:00:04, -100, \
                              9, AA:BB:CC:DD:EE:01,";
const STA_PHONE_WARM: &str = "B8:27:EB:44:55:66, 2024-01-01 10:00:02, 2024-01-01 10:00:08, -40, \
                              21, AA:BB:CC:DD:EE:01,";
const STA_ORPHAN: &str = "11:22:33:44:55:77, 2024-01-01 10:00:02, 2024-01-01 10:00:04, -55, 2, \
                          AA:BB:CC:DD:EE:99,";

#[test]
fn first_poll_surfaces_networks_and_clients() {
    let (tx, rx) = channel();
    let mut state = ScanState::default();

    let report = sidecar::parse(&sidecar_file(
        &[AP_HOME, AP_LAB],
        &[STA_PHONE_COLD, STA_ORPHAN],
    ));
    state.apply_report(&report, &tx);

    let events = rx.drain();
    let found_networks = events
        .iter()
        .filter(|ev| matches!(ev, ScanEvent::NetworkFound(_)))
        .count();
    let found_clients = events
        .iter()
        .filter(|ev| matches!(ev, ScanEvent::ClientFound(_)))
        .count();
    assert_eq!(found_networks, 2);
    assert_eq!(found_clients, 1);

    // The orphan station references an AP that never appeared.
    assert_eq!(state.clients().len(), 1);
    assert_eq!(state.networks().len(), 2);
}

#[test]
fn identical_polls_are_quiet() {
    let (tx, rx) = channel();
    let mut state = ScanState::default();
    let content = sidecar_file(&[AP_HOME, AP_LAB], &[STA_PHONE_COLD]);

    state.apply_report(&sidecar::parse(&content), &tx);
    rx.drain();

    state.apply_report(&sidecar::parse(&content), &tx);
    state.apply_report(&sidecar::parse(&content), &tx);
    assert!(rx.drain().is_empty());
}

#[test]
fn power_changes_produce_single_updates() {
    let (tx, rx) = channel();
    let mut state = ScanState::default();

    state.apply_report(
        &sidecar::parse(&sidecar_file(&[AP_HOME], &[STA_PHONE_COLD])),
        &tx,
    );
    rx.drain();

    state.apply_report(
        &sidecar::parse(&sidecar_file(&[AP_HOME_WEAKER], &[STA_PHONE_WARM])),
        &tx,
    );

    let events = rx.drain();
    assert_eq!(events.len(), 2);
    assert!(events.iter().any(|ev| matches!(
        ev,
        ScanEvent::NetworkUpdated(network) if network.power == -63
    )));
    assert!(events.iter().any(|ev| matches!(
        ev,
        ScanEvent::ClientUpdated(client) if client.power == -40
    )));
}

#[test]
fn late_arriving_ap_adopts_previously_dropped_station() {
    let (tx, rx) = channel();
    let mut state = ScanState::default();

    // Station first, its AP not yet in the file: dropped.
    state.apply_report(&sidecar::parse(&sidecar_file(&[], &[STA_PHONE_COLD])), &tx);
    assert!(rx.drain().is_empty());

    // Next rewrite carries the AP row as well; the pair is re-offered.
    state.apply_report(
        &sidecar::parse(&sidecar_file(&[AP_HOME], &[STA_PHONE_COLD])),
        &tx,
    );
    let events = rx.drain();
    assert!(events
        .iter()
        .any(|ev| matches!(ev, ScanEvent::NetworkFound(_))));
    assert!(events
        .iter()
        .any(|ev| matches!(ev, ScanEvent::ClientFound(_))));
}

#[test]
fn client_vendor_comes_from_the_oui_table() {
    let (tx, rx) = channel();
    let mut state = ScanState::default();
    state.apply_report(
        &sidecar::parse(&sidecar_file(&[AP_HOME], &[STA_PHONE_COLD])),
        &tx,
    );

    let vendor = rx
        .drain()
        .into_iter()
        .find_map(|ev| match ev {
            ScanEvent::ClientFound(client) => Some(client.vendor),
            _ => None,
        })
        .expect("client event");
    assert_eq!(vendor, "Raspberry Pi");
}
