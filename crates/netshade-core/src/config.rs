use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_WORK_DIR: &str = "/tmp/netshade";
pub const DEFAULT_CAPTURED_DIR: &str = "captured";
pub const DEFAULT_WORDLIST: &str = "/usr/share/wordlists/rockyou.txt";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 3000;

/// Runtime configuration, resolved once at startup and passed around
/// immutably.
#[derive(Debug, Clone)]
pub struct Config {
    /// Scratch directory for live-scan sidecar files.
    pub work_dir: PathBuf,
    /// Directory where handshake captures and conversions are stored.
    pub captured_dir: PathBuf,
    /// Wordlist used when a crack run does not name one.
    pub default_wordlist: PathBuf,
    /// Interval between sidecar polls.
    pub poll_interval: Duration,
    /// How long a stop request waits before escalating to a kill.
    pub stop_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let work_dir = env::var("NETSHADE_WORK_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR));
        let captured_dir = env::var("NETSHADE_CAPTURED_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CAPTURED_DIR));
        let default_wordlist = env::var("NETSHADE_WORDLIST")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORDLIST));
        let poll_interval = env::var("NETSHADE_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        let stop_timeout = env::var("NETSHADE_STOP_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_STOP_TIMEOUT_MS);

        Self {
            work_dir,
            captured_dir,
            default_wordlist,
            poll_interval: Duration::from_millis(poll_interval),
            stop_timeout: Duration::from_millis(stop_timeout),
        }
    }

    /// Create the work and capture directories if they are missing.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(&self.work_dir)?;
        fs::create_dir_all(&self.captured_dir)?;
        Ok(())
    }

    /// Prefix handed to airodump-ng for live-scan output files.
    pub fn scan_prefix(&self) -> PathBuf {
        self.work_dir.join("scan")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            captured_dir: PathBuf::from(DEFAULT_CAPTURED_DIR),
            default_wordlist: PathBuf::from(DEFAULT_WORDLIST),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            stop_timeout: Duration::from_millis(DEFAULT_STOP_TIMEOUT_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_consts() {
        let config = Config::default();
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.stop_timeout, Duration::from_millis(3000));
        assert_eq!(config.scan_prefix(), PathBuf::from("/tmp/netshade/scan"));
    }

    #[test]
    fn ensure_dirs_creates_missing_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            work_dir: tmp.path().join("work"),
            captured_dir: tmp.path().join("captured"),
            ..Config::default()
        };
        config.ensure_dirs().unwrap();
        assert!(config.work_dir.is_dir());
        assert!(config.captured_dir.is_dir());
    }
}
