//! Deauthentication sessions.
//!
//! Wraps `aireplay-ng --deauth 0`, either broadcast (all clients of an AP)
//! or aimed at one station. User-supplied addresses are validated before
//! any process is spawned.

use tracing::{info, warn};

use netshade_core::{Config, MacAddress};

use crate::command;
use crate::error::{Result, WirelessError};
use crate::events::{EventSender, ProcessEvent, SessionEvent};
use crate::supervisor::{ProcessSupervisor, SupervisedChild};

pub struct DeauthSession {
    supervisor: ProcessSupervisor,
    events: EventSender<SessionEvent>,
    child: Option<SupervisedChild>,
}

impl DeauthSession {
    pub fn new(config: &Config, events: EventSender<SessionEvent>) -> Self {
        Self {
            supervisor: ProcessSupervisor::new(config.stop_timeout),
            events,
            child: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.child.as_ref().map(|c| c.is_running()).unwrap_or(false)
    }

    /// Start a continuous deauth against `bssid`, optionally aimed at a
    /// single station. Address validation happens before the spawn.
    pub fn start(&mut self, bssid: &str, station: Option<&str>, interface: &str) -> Result<()> {
        let bssid: MacAddress = bssid.trim().parse().map_err(WirelessError::from)?;
        let station: Option<MacAddress> = station
            .map(|s| s.trim().parse())
            .transpose()
            .map_err(WirelessError::from)?;

        command::require_tool("aireplay-ng")?;
        if self.child.is_some() {
            self.stop()?;
        }

        let tx = self.events.clone();
        let spawned = self.supervisor.spawn(
            command::aireplay_deauth(bssid, station, interface),
            move |event| match event {
                ProcessEvent::Line(line) => tx.send(SessionEvent::Line(line)),
                ProcessEvent::Exited { code } => tx.send(SessionEvent::Completed { code }),
            },
        );

        match spawned {
            Ok(child) => {
                match station {
                    Some(station) => info!("deauth started: {} -> {}", bssid, station),
                    None => info!("deauth started: {} -> all clients", bssid),
                }
                self.child = Some(child);
                Ok(())
            }
            Err(err) => {
                self.events.send(SessionEvent::Failed {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Deauth with the card pinned to the target's channel first. Used for
    /// sustained jamming where the scan interface may have hopped away.
    pub fn start_on_channel(
        &mut self,
        bssid: &str,
        station: Option<&str>,
        channel: i32,
        interface: &str,
    ) -> Result<()> {
        let pin = command::iwconfig_set_channel(interface, channel);
        match pin.to_command().output() {
            Ok(output) if !output.status.success() => {
                warn!("could not pin {} to channel {}", interface, channel);
            }
            Err(err) => warn!("channel pin failed: {}", err),
            _ => {}
        }
        self.start(bssid, station, interface)
    }

    pub fn stop(&mut self) -> Result<()> {
        if let Some(child) = self.child.take() {
            child.stop()?;
        }
        Ok(())
    }
}

impl Drop for DeauthSession {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::channel;

    #[test]
    fn invalid_addresses_are_rejected_before_spawn() {
        let (tx, rx) = channel();
        let mut session = DeauthSession::new(&Config::default(), tx);

        let err = session.start("not-a-mac", None, "wlan0mon").unwrap_err();
        assert!(matches!(err, WirelessError::InvalidMac(_)));

        let err = session
            .start("aa:bb:cc:dd:ee:ff", Some("bogus"), "wlan0mon")
            .unwrap_err();
        assert!(matches!(err, WirelessError::InvalidMac(_)));

        // Validation failures never reach the queue: no spawn, no events.
        assert!(rx.drain().is_empty());
        assert!(!session.is_running());
    }
}
