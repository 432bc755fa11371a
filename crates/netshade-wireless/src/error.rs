//! Error types for wireless operations.

use netshade_core::{CancelledError, MacParseError};
use thiserror::Error;

/// Result type alias for wireless operations.
pub type Result<T> = std::result::Result<T, WirelessError>;

#[derive(Error, Debug)]
pub enum WirelessError {
    /// Child process could not be started (binary missing, permission
    /// denied). The operation is aborted; nothing is retried.
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A running child misbehaved in a way we cannot report as an exit code.
    #[error("Process error: {0}")]
    Process(String),

    /// Interface not found or in the wrong state.
    #[error("Interface error: {0}")]
    Interface(String),

    /// Required external tool is not installed.
    #[error("Missing tool: {0}")]
    Tool(String),

    /// Address failed validation before any process was spawned.
    #[error("Invalid hardware address: {0}")]
    InvalidMac(#[from] MacParseError),

    /// Sidecar file could not be interpreted.
    #[error("Sidecar parse error: {0}")]
    Sidecar(String),

    /// Operation cancelled by a stop request.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("System error: {0}")]
    System(String),
}

impl WirelessError {
    pub fn interface(msg: impl Into<String>) -> Self {
        Self::Interface(msg.into())
    }

    pub fn system(msg: impl Into<String>) -> Self {
        Self::System(msg.into())
    }

    /// True when the error means the target binary is absent.
    pub fn is_missing_tool(&self) -> bool {
        match self {
            Self::Tool(_) => true,
            Self::Spawn { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<CancelledError> for WirelessError {
    fn from(_: CancelledError) -> Self {
        Self::Cancelled
    }
}
