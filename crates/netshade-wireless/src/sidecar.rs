//! Parsing of the airodump-ng CSV sidecar file.
//!
//! The file is rewritten in place every few seconds while a scan runs. It
//! holds two tabular sections separated by a blank line: access points
//! first, then associated stations, each with a two-line header. Rows that
//! are too short or carry an invalid hardware address are skipped without
//! comment; the next rewrite will offer them again.

use netshade_core::MacAddress;

/// Sentinel used when an access point does not broadcast its name.
pub const HIDDEN_SSID: &str = "<Hidden>";

/// The separator is matched literally; a file with foreign line endings
/// parses as a single access-point section and yields no stations.
const SECTION_SEPARATOR: &str = "\r\n\r\n";

const HEADER_LINES: usize = 2;
const AP_FIELD_COUNT: usize = 14;
const STATION_FIELD_COUNT: usize = 6;

/// One access-point row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRow {
    pub bssid: MacAddress,
    pub ssid: String,
    pub channel: i32,
    pub power: i32,
    pub privacy: String,
}

/// One station row. `bssid` is `None` for unassociated stations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationRow {
    pub station: MacAddress,
    pub power: i32,
    pub bssid: Option<MacAddress>,
}

#[derive(Debug, Clone, Default)]
pub struct SidecarReport {
    pub networks: Vec<NetworkRow>,
    pub stations: Vec<StationRow>,
}

/// Parse a whole sidecar file. Malformed rows are dropped silently.
pub fn parse(content: &str) -> SidecarReport {
    let (ap_section, station_section) = split_sections(content);

    let networks = ap_section
        .trim()
        .lines()
        .skip(HEADER_LINES)
        .filter_map(parse_network_row)
        .collect();

    let stations = station_section
        .map(|section| {
            section
                .trim()
                .lines()
                .skip(HEADER_LINES)
                .filter_map(parse_station_row)
                .collect()
        })
        .unwrap_or_default();

    SidecarReport { networks, stations }
}

fn split_sections(content: &str) -> (&str, Option<&str>) {
    match content.split_once(SECTION_SEPARATOR) {
        Some((aps, stations)) => (aps, Some(stations)),
        None => (content, None),
    }
}

fn parse_network_row(line: &str) -> Option<NetworkRow> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < AP_FIELD_COUNT {
        return None;
    }

    let bssid: MacAddress = fields[0].parse().ok()?;
    let ssid = if fields[13].is_empty() {
        HIDDEN_SSID.to_string()
    } else {
        fields[13].to_string()
    };

    Some(NetworkRow {
        bssid,
        ssid,
        channel: fields[3].parse().unwrap_or(-1),
        power: fields[8].parse().unwrap_or(-1),
        privacy: fields[5].to_string(),
    })
}

fn parse_station_row(line: &str) -> Option<StationRow> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < STATION_FIELD_COUNT {
        return None;
    }

    let station: MacAddress = fields[0].parse().ok()?;
    Some(StationRow {
        station,
        power: fields[3].parse().unwrap_or(-1),
        bssid: fields[5].parse().ok(),
    })
}
