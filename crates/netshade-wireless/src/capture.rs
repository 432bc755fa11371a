//! Targeted handshake capture.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use netshade_core::{Config, MacAddress};

use crate::command;
use crate::error::{Result, WirelessError};
use crate::events::{EventSender, ProcessEvent, SessionEvent};
use crate::supervisor::{ProcessSupervisor, SupervisedChild};

/// Marker airodump-ng prints once the four-way handshake is on disk.
const HANDSHAKE_MARKER: &str = "WPA handshake";

/// Runs a single-AP airodump-ng capture, writing a `.cap` next to the
/// configured capture directory and announcing the handshake when the
/// tool reports one. Starting while a capture is active stops it first.
pub struct CaptureSession {
    config: Config,
    supervisor: ProcessSupervisor,
    events: EventSender<SessionEvent>,
    child: Option<SupervisedChild>,
}

impl CaptureSession {
    pub fn new(config: Config, events: EventSender<SessionEvent>) -> Self {
        let supervisor = ProcessSupervisor::new(config.stop_timeout);
        Self {
            config,
            supervisor,
            events,
            child: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.child.as_ref().map(|c| c.is_running()).unwrap_or(false)
    }

    /// Start capturing `bssid` on `channel`. Returns the output prefix;
    /// airodump-ng appends `-01.cap` to it.
    pub fn start(
        &mut self,
        bssid: MacAddress,
        channel: i32,
        name: &str,
        interface: &str,
    ) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(WirelessError::system(format!(
                "invalid capture name '{name}'"
            )));
        }
        command::require_tool("airodump-ng")?;
        if self.child.is_some() {
            self.stop()?;
        }

        self.config.ensure_dirs()?;
        let prefix = self.config.captured_dir.join(name);

        let tx = self.events.clone();
        let announced = Arc::new(AtomicBool::new(false));
        let spawned = self.supervisor.spawn(
            command::airodump_capture(bssid, channel, &prefix, interface),
            move |event| match event {
                ProcessEvent::Line(line) => {
                    if is_handshake_line(&line) && !announced.swap(true, Ordering::Relaxed) {
                        tx.send(SessionEvent::HandshakeCaptured { bssid });
                    }
                    tx.send(SessionEvent::Line(line));
                }
                ProcessEvent::Exited { code } => tx.send(SessionEvent::Completed { code }),
            },
        );

        match spawned {
            Ok(child) => {
                info!("handshake capture started for {} -> {}", bssid, prefix.display());
                self.child = Some(child);
                Ok(prefix)
            }
            Err(err) => {
                self.events.send(SessionEvent::Failed {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    pub fn stop(&mut self) -> Result<()> {
        if let Some(child) = self.child.take() {
            child.stop()?;
        }
        Ok(())
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// True when a tool output line reports a captured handshake.
pub fn is_handshake_line(line: &str) -> bool {
    line.contains(HANDSHAKE_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::channel;

    #[test]
    fn handshake_marker_detection() {
        assert!(is_handshake_line(
            "CH  6 ][ Elapsed: 1 min ][ WPA handshake: AA:BB:CC:DD:EE:FF"
        ));
        assert!(!is_handshake_line("CH  6 ][ Elapsed: 1 min"));
    }

    #[test]
    fn rejects_names_with_path_separators() {
        let (tx, _rx) = channel();
        let mut session = CaptureSession::new(Config::default(), tx);
        let bssid: MacAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        assert!(session.start(bssid, 6, "../evil", "wlan0mon").is_err());
        assert!(session.start(bssid, 6, "", "wlan0mon").is_err());
    }
}
