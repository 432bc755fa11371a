//! Typed events and the queue that carries them.
//!
//! Ingestion components publish onto an [`EventSender`]; the presentation
//! layer owns the matching [`EventReceiver`] and drains it on its own
//! schedule. Nothing in this crate ever calls back into the consumer.

use std::sync::mpsc;
use std::time::Duration;

use serde::Serialize;

use netshade_core::MacAddress;

use crate::scan::{Client, Network};

/// Raw output of a supervised child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ProcessEvent {
    /// One non-empty line of merged stdout/stderr.
    Line(String),
    /// Terminal event, emitted exactly once per child. `code` is `None`
    /// when the child was killed by a signal.
    Exited { code: Option<i32> },
}

/// Change notifications from the scan ingestor.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ScanEvent {
    NetworkFound(Network),
    NetworkUpdated(Network),
    ClientFound(Client),
    ClientUpdated(Client),
    /// Raw line from the capture process, for display only.
    CaptureLine(String),
    /// The capture process ended on its own or was stopped.
    CaptureExited { code: Option<i32> },
}

/// Events from capture, deauth, and crack sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEvent {
    Line(String),
    /// The capture output reported a completed WPA handshake.
    HandshakeCaptured { bssid: MacAddress },
    /// aircrack-ng reported a recovered key.
    KeyFound { key: String },
    /// Child exited; non-zero codes are reported by renderers as warnings.
    Completed { code: Option<i32> },
    /// The operation could not start or died unexpectedly.
    Failed { reason: String },
}

pub struct EventSender<T>(mpsc::Sender<T>);

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> EventSender<T> {
    /// Publish an event. A vanished receiver drops the event; publishers
    /// never fail because the consumer went away.
    pub fn send(&self, event: T) {
        let _ = self.0.send(event);
    }
}

pub struct EventReceiver<T>(mpsc::Receiver<T>);

impl<T> EventReceiver<T> {
    /// Take everything currently queued without blocking.
    pub fn drain(&self) -> Vec<T> {
        self.0.try_iter().collect()
    }

    pub fn try_recv(&self) -> Option<T> {
        self.0.try_recv().ok()
    }

    /// Block up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        self.0.recv_timeout(timeout).ok()
    }
}

pub fn channel<T>() -> (EventSender<T>, EventReceiver<T>) {
    let (tx, rx) = mpsc::channel();
    (EventSender(tx), EventReceiver(rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_queued_events_in_order() {
        let (tx, rx) = channel();
        tx.send(1);
        tx.send(2);
        tx.send(3);
        assert_eq!(rx.drain(), vec![1, 2, 3]);
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn send_after_receiver_dropped_is_silent() {
        let (tx, rx) = channel();
        drop(rx);
        tx.send(42);
    }
}
