//! Offline password recovery and capture conversion.
//!
//! Cracking itself is aircrack-ng's job; this module supervises it, spots
//! the recovered key in its output, and converts captures to the formats
//! other crackers expect.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use netshade_core::{CancelFlag, Config};

use crate::command::{self, is_tool_available};
use crate::error::{Result, WirelessError};
use crate::events::{EventSender, ProcessEvent, SessionEvent};
use crate::supervisor::{ProcessSupervisor, SupervisedChild};

static KEY_FOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"KEY FOUND!\s*\[\s*(.+?)\s*\]").expect("key pattern"));

/// Extract the recovered key from an aircrack-ng output line.
pub fn parse_key_found(line: &str) -> Option<String> {
    KEY_FOUND
        .captures(line)
        .map(|caps| caps[1].to_string())
}

/// Dictionary attack against a captured handshake.
pub struct CrackSession {
    config: Config,
    supervisor: ProcessSupervisor,
    events: EventSender<SessionEvent>,
    child: Option<SupervisedChild>,
}

impl CrackSession {
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

    /// Start aircrack-ng over `cap`. Falls back to the configured default
    /// wordlist when none is given.
    pub fn start(&mut self, cap: &Path, wordlist: Option<&Path>) -> Result<()> {
        let wordlist: PathBuf = wordlist
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.default_wordlist.clone());
        require_file(cap)?;
        require_file(&wordlist)?;
        command::require_tool("aircrack-ng")?;

        if self.child.is_some() {
            self.stop()?;
        }

        let tx = self.events.clone();
        let spawned = self.supervisor.spawn(
            command::aircrack_wordlist(cap, &wordlist),
            move |event| match event {
                ProcessEvent::Line(line) => {
                    if let Some(key) = parse_key_found(&line) {
                        tx.send(SessionEvent::KeyFound { key });
                    }
                    tx.send(SessionEvent::Line(line));
                }
                ProcessEvent::Exited { code } => tx.send(SessionEvent::Completed { code }),
            },
        );

        match spawned {
            Ok(child) => {
                info!("aircrack-ng started over {}", cap.display());
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

    pub fn stop(&mut self) -> Result<()> {
        if let Some(child) = self.child.take() {
            child.stop()?;
        }
        Ok(())
    }
}

impl Drop for CrackSession {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Convert a capture to hashcat's hc22000 format. Prefers hcxpcapngtool;
/// falls back to aircrack-ng's hccap export when it is not installed.
pub fn convert_to_hashcat<F>(
    supervisor: &ProcessSupervisor,
    cap: &Path,
    out_dir: &Path,
    cancel: Option<&CancelFlag>,
    on_event: F,
) -> Result<PathBuf>
where
    F: Fn(ProcessEvent) + Send + Sync + 'static,
{
    require_file(cap)?;
    let stem = capture_stem(cap)?;

    if is_tool_available("hcxpcapngtool") {
        let out = out_dir.join(format!("{stem}.hc22000"));
        let code = supervisor.run(command::hcx_convert(cap, &out), cancel, on_event)?;
        finish_conversion(code, out)
    } else {
        warn!("hcxpcapngtool not found, using aircrack-ng fallback");
        command::require_tool("aircrack-ng")?;
        let prefix = out_dir.join(&stem);
        let code = supervisor.run(command::aircrack_export_john(cap, &prefix), cancel, on_event)?;
        finish_conversion(code, prefix.with_extension("hccap"))
    }
}

/// Convert a capture to John the Ripper's hccap format.
pub fn convert_to_john<F>(
    supervisor: &ProcessSupervisor,
    cap: &Path,
    out_dir: &Path,
    cancel: Option<&CancelFlag>,
    on_event: F,
) -> Result<PathBuf>
where
    F: Fn(ProcessEvent) + Send + Sync + 'static,
{
    require_file(cap)?;
    command::require_tool("aircrack-ng")?;
    let stem = capture_stem(cap)?;
    let prefix = out_dir.join(&stem);
    let code = supervisor.run(command::aircrack_export_john(cap, &prefix), cancel, on_event)?;
    finish_conversion(code, prefix.with_extension("hccap"))
}

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(WirelessError::system(format!(
            "file not found: {}",
            path.display()
        )))
    }
}

fn capture_stem(cap: &Path) -> Result<String> {
    cap.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| WirelessError::system(format!("bad capture path: {}", cap.display())))
}

fn finish_conversion(code: Option<i32>, out: PathBuf) -> Result<PathBuf> {
    match code {
        Some(0) => Ok(out),
        other => Err(WirelessError::Process(format!(
            "conversion exited with code {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_key_from_aircrack_output() {
        assert_eq!(
            parse_key_found("                         KEY FOUND! [ hunter2 ]"),
            Some("hunter2".to_string())
        );
        assert_eq!(
            parse_key_found("KEY FOUND! [ pass with spaces ]"),
            Some("pass with spaces".to_string())
        );
        assert_eq!(parse_key_found("Tested 1024 keys"), None);
    }

    #[test]
    fn missing_capture_is_rejected_before_spawn() {
        let (tx, rx) = crate::events::channel();
        let mut session = CrackSession::new(Config::default(), tx);
        let err = session
            .start(Path::new("/nonexistent/file.cap"), None)
            .unwrap_err();
        assert!(matches!(err, WirelessError::System(_)));
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn capture_stems() {
        assert_eq!(
            capture_stem(Path::new("captured/home-01.cap")).unwrap(),
            "home-01"
        );
    }
}
