//! Child-process supervision.
//!
//! Every external command goes through [`ProcessSupervisor`]: the child is
//! spawned with both output streams piped, forwarder threads turn each
//! non-empty line into a [`ProcessEvent::Line`], and a monitor thread emits
//! exactly one [`ProcessEvent::Exited`] when the child goes away. Stopping
//! is graceful first (SIGTERM, bounded wait) and forced after the timeout.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, warn};

use netshade_core::{check_cancel, CancelFlag};

use crate::command::ToolCommand;
use crate::error::{Result, WirelessError};
use crate::events::ProcessEvent;

const MONITOR_TICK: Duration = Duration::from_millis(150);
const STOP_POLL: Duration = Duration::from_millis(100);

/// Shared event sink handed to the supervisor's worker threads.
pub type ProcessSink = Arc<dyn Fn(ProcessEvent) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    stop_timeout: Duration,
}

impl ProcessSupervisor {
    pub fn new(stop_timeout: Duration) -> Self {
        Self { stop_timeout }
    }

    /// Spawn `command` and stream its output into `on_event`.
    ///
    /// A spawn failure (missing binary, permission denied) is returned to
    /// the caller directly; the operation is aborted and nothing retries.
    pub fn spawn<F>(&self, command: ToolCommand, on_event: F) -> Result<SupervisedChild>
    where
        F: Fn(ProcessEvent) + Send + Sync + 'static,
    {
        let sink: ProcessSink = Arc::new(on_event);

        let mut child = command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| WirelessError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let pid = child.id();
        debug!("spawned '{}' as pid {}", command, pid);

        let stop_requested = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let child = Arc::new(Mutex::new(child));

        let mut forwarders = Vec::new();
        if let Some(stream) = stdout {
            forwarders.push(spawn_line_forwarder(
                stream,
                Arc::clone(&sink),
                Arc::clone(&stop_requested),
            ));
        }
        if let Some(stream) = stderr {
            forwarders.push(spawn_line_forwarder(
                stream,
                Arc::clone(&sink),
                Arc::clone(&stop_requested),
            ));
        }
        let monitor = spawn_exit_monitor(
            Arc::clone(&child),
            Arc::clone(&running),
            sink,
            forwarders,
        );

        Ok(SupervisedChild {
            command,
            pid,
            child,
            running,
            stop_requested,
            stop_timeout: self.stop_timeout,
            threads: Mutex::new(vec![monitor]),
        })
    }

    /// Spawn `command` and block until it exits, honouring a cancellation
    /// flag. Returns the exit code (`None` if signal-killed).
    pub fn run<F>(
        &self,
        command: ToolCommand,
        cancel: Option<&CancelFlag>,
        on_event: F,
    ) -> Result<Option<i32>>
    where
        F: Fn(ProcessEvent) + Send + Sync + 'static,
    {
        let exit_code: Arc<Mutex<Option<Option<i32>>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&exit_code);
        let child = self.spawn(command, move |event| {
            if let ProcessEvent::Exited { code } = &event {
                *lock_ignore_poison(&slot) = Some(*code);
            }
            on_event(event);
        })?;

        let mut cancelled = false;
        while child.is_running() {
            if !cancelled && check_cancel(cancel).is_err() {
                cancelled = true;
                child.stop()?;
            }
            thread::sleep(STOP_POLL);
        }
        child.join_threads();

        if cancelled {
            return Err(WirelessError::Cancelled);
        }
        let result = lock_ignore_poison(&exit_code).take().flatten();
        Ok(result)
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(Duration::from_millis(3000))
    }
}

/// Handle to a supervised child process.
#[derive(Debug)]
pub struct SupervisedChild {
    command: ToolCommand,
    pid: u32,
    child: Arc<Mutex<Child>>,
    running: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
    stop_timeout: Duration,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl SupervisedChild {
    pub fn id(&self) -> u32 {
        self.pid
    }

    pub fn command(&self) -> &ToolCommand {
        &self.command
    }

    /// False once the exit event has been emitted.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Relaxed)
    }

    /// Request termination: SIGTERM, bounded wait, then SIGKILL.
    ///
    /// Calling this on a child that already exited is a no-op.
    pub fn stop(&self) -> Result<()> {
        self.stop_requested.store(true, Ordering::Relaxed);

        {
            let mut child = lock_ignore_poison(&self.child);
            match child.try_wait() {
                Ok(Some(_)) => {}
                Ok(None) => {
                    let _ = signal::kill(Pid::from_raw(self.pid as i32), Signal::SIGTERM);
                    if !wait_for_exit(&mut child, self.stop_timeout) {
                        warn!("pid {} ignored SIGTERM, sending SIGKILL", self.pid);
                        let _ = child.kill();
                        let _ = child.wait();
                    }
                }
                Err(err) => {
                    warn!("could not query pid {}: {}", self.pid, err);
                }
            }
        }

        self.join_threads();
        Ok(())
    }

    /// Block until the child has exited and all worker threads are done.
    pub fn wait(&self) {
        while self.is_running() {
            thread::sleep(STOP_POLL);
        }
        self.join_threads();
    }

    fn join_threads(&self) {
        let handles: Vec<JoinHandle<()>> = lock_ignore_poison(&self.threads).drain(..).collect();
        for handle in handles {
            let _ = handle.join();
        }
    }
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) => thread::sleep(STOP_POLL),
            Err(err) => {
                warn!("try_wait failed: {}", err);
                return false;
            }
        }
    }
    false
}

fn spawn_line_forwarder<R>(
    stream: R,
    sink: ProcessSink,
    stop_requested: Arc<AtomicBool>,
) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            if stop_requested.load(Ordering::Relaxed) {
                break;
            }
            match line {
                Ok(line) => {
                    let line = line.trim_end().to_string();
                    if !line.is_empty() {
                        sink(ProcessEvent::Line(line));
                    }
                }
                Err(err) => {
                    debug!("output stream closed: {}", err);
                    break;
                }
            }
        }
    })
}

fn spawn_exit_monitor(
    child: Arc<Mutex<Child>>,
    running: Arc<AtomicBool>,
    sink: ProcessSink,
    forwarders: Vec<JoinHandle<()>>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let code = loop {
            let status = lock_ignore_poison(&child).try_wait();
            match status {
                Ok(Some(status)) => break status.code(),
                Ok(None) => thread::sleep(MONITOR_TICK),
                Err(err) => {
                    warn!("lost track of child: {}", err);
                    break None;
                }
            }
        };

        // Flush remaining output before the terminal event; the pipes hit
        // EOF once the child is gone, so these joins are bounded.
        for handle in forwarders {
            let _ = handle.join();
        }

        sink(ProcessEvent::Exited { code });
        running.store(false, Ordering::Release);
    })
}

pub(crate) fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::channel;

    fn shell(script: &str) -> ToolCommand {
        ToolCommand::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn forwards_lines_and_exit_code() {
        let (tx, rx) = channel();
        let supervisor = ProcessSupervisor::default();
        let child = supervisor
            .spawn(shell("printf 'one\\ntwo\\n\\n'; exit 3"), move |ev| tx.send(ev))
            .unwrap();
        child.wait();

        let events = rx.drain();
        let lines: Vec<_> = events
            .iter()
            .filter_map(|ev| match ev {
                ProcessEvent::Line(line) => Some(line.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(lines, ["one", "two"]);
        assert_eq!(
            events.last(),
            Some(&ProcessEvent::Exited { code: Some(3) })
        );
    }

    #[test]
    fn empty_lines_are_dropped() {
        let (tx, rx) = channel();
        let supervisor = ProcessSupervisor::default();
        let child = supervisor
            .spawn(shell("printf '\\n\\nhello\\n\\n'"), move |ev| tx.send(ev))
            .unwrap();
        child.wait();

        let lines: Vec<_> = rx
            .drain()
            .into_iter()
            .filter_map(|ev| match ev {
                ProcessEvent::Line(line) => Some(line),
                _ => None,
            })
            .collect();
        assert_eq!(lines, ["hello"]);
    }

    #[test]
    fn stderr_is_merged_into_the_line_stream() {
        let (tx, rx) = channel();
        let supervisor = ProcessSupervisor::default();
        let child = supervisor
            .spawn(shell("echo err >&2"), move |ev| tx.send(ev))
            .unwrap();
        child.wait();

        let lines: Vec<_> = rx
            .drain()
            .into_iter()
            .filter_map(|ev| match ev {
                ProcessEvent::Line(line) => Some(line),
                _ => None,
            })
            .collect();
        assert_eq!(lines, ["err"]);
    }

    #[test]
    fn stop_terminates_a_long_running_child() {
        let (tx, rx) = channel();
        let supervisor = ProcessSupervisor::new(Duration::from_millis(500));
        let child = supervisor
            .spawn(shell("sleep 30"), move |ev| tx.send(ev))
            .unwrap();

        let start = Instant::now();
        child.stop().unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        child.wait();
        assert!(!child.is_running());

        let events = rx.drain();
        assert!(events
            .iter()
            .any(|ev| matches!(ev, ProcessEvent::Exited { code: None })));
    }

    #[test]
    fn stop_after_exit_is_a_no_op() {
        let (tx, _rx) = channel();
        let supervisor = ProcessSupervisor::default();
        let child = supervisor.spawn(shell("true"), move |ev| tx.send(ev)).unwrap();
        child.wait();
        assert!(!child.is_running());

        child.stop().unwrap();
        child.stop().unwrap();
    }

    #[test]
    fn spawn_failure_reports_the_command() {
        let supervisor = ProcessSupervisor::default();
        let missing = ToolCommand::new("netshade-no-such-binary").arg("x");
        let err = supervisor.spawn(missing, |_| {}).unwrap_err();
        match err {
            WirelessError::Spawn { command, .. } => {
                assert!(command.contains("netshade-no-such-binary"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn run_returns_the_exit_code() {
        let supervisor = ProcessSupervisor::default();
        let code = supervisor.run(shell("exit 7"), None, |_| {}).unwrap();
        assert_eq!(code, Some(7));
    }

    #[test]
    fn run_honours_cancellation() {
        let supervisor = ProcessSupervisor::new(Duration::from_millis(500));
        let cancel = netshade_core::new_cancel_flag();
        cancel.store(true, Ordering::Relaxed);
        let err = supervisor
            .run(shell("sleep 30"), Some(&cancel), |_| {})
            .unwrap_err();
        assert!(matches!(err, WirelessError::Cancelled));
    }
}
