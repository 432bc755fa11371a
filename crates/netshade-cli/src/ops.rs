//! One handler per subcommand. Handlers own the event-queue drain loop;
//! the library side only ever publishes.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use netshade_core::{new_cancel_flag, CancelFlag, Config, MacAddress};
use netshade_wireless::capture::CaptureSession;
use netshade_wireless::crack::{self, CrackSession};
use netshade_wireless::deauth::DeauthSession;
use netshade_wireless::interface;
use netshade_wireless::{
    channel, Band, EventReceiver, ProcessEvent, ScanEvent, ScanIngestor, SessionEvent,
    ProcessSupervisor, WirelessError,
};

use crate::cli::{Cli, Command, ConvertFormat, MonitorCommand};
use crate::render;
use crate::theme::Theme;

const DRAIN_TICK: Duration = Duration::from_millis(250);

pub fn run(cli: Cli) -> Result<()> {
    let theme = Theme::dark();
    let config = Config::from_env();

    if !netshade_wireless::check_privileges() {
        render::warning(
            &theme,
            "not running as root; wireless operations will likely fail",
        );
    }

    match cli.command {
        Command::Interfaces => cmd_interfaces(&theme),
        Command::Monitor(command) => cmd_monitor(&theme, &config, command),
        Command::Scan {
            interface,
            band,
            duration,
        } => cmd_scan(&theme, &config, interface, band, duration),
        Command::Capture {
            bssid,
            channel,
            name,
            interface,
        } => cmd_capture(&theme, &config, &bssid, channel, &name, &interface),
        Command::Deauth {
            bssid,
            client,
            channel,
            interface,
        } => cmd_deauth(&theme, &config, &bssid, client.as_deref(), channel, &interface),
        Command::Crack { cap, wordlist } => cmd_crack(&theme, &config, &cap, wordlist.as_deref()),
        Command::Convert {
            cap,
            format,
            out_dir,
        } => cmd_convert(&theme, &config, &cap, format, out_dir),
    }
}

fn install_ctrl_c() -> Result<CancelFlag> {
    let cancel = new_cancel_flag();
    let flag = cancel.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .context("installing Ctrl-C handler")?;
    Ok(cancel)
}

fn cmd_interfaces(theme: &Theme) -> Result<()> {
    let infos = interface::describe_all().context("listing wireless interfaces")?;
    if infos.is_empty() {
        render::warning(theme, "no wireless interfaces found");
        return Ok(());
    }

    for info in infos {
        let driver = info.driver.as_deref().unwrap_or("unknown");
        render::info(
            theme,
            &format!("{:<12} {:<8} driver: {}", info.name, info.mode.as_str(), driver),
        );
    }
    Ok(())
}

fn cmd_monitor(theme: &Theme, config: &Config, command: MonitorCommand) -> Result<()> {
    let supervisor = ProcessSupervisor::new(config.stop_timeout);
    let cancel = install_ctrl_c()?;
    let theme_copy = *theme;
    let on_event = move |event: ProcessEvent| {
        if let ProcessEvent::Line(line) = event {
            render::raw(&theme_copy, &line);
        }
    };

    let result = match &command {
        MonitorCommand::Enable { interface } => {
            render::info(theme, &format!("enabling monitor mode on {interface}"));
            interface::enable_monitor(&supervisor, interface, Some(&cancel), on_event)
        }
        MonitorCommand::Disable { interface } => {
            let mon = interface::monitor_name(interface);
            render::info(theme, &format!("disabling monitor mode on {mon}"));
            interface::disable_monitor(&supervisor, &mon, Some(&cancel), on_event)
        }
        MonitorCommand::Kill => {
            render::warning(theme, "killing interfering processes");
            interface::kill_interfering(&supervisor, Some(&cancel), on_event)
        }
    };

    match result {
        Ok(Some(0)) => render::success(theme, "command completed"),
        Ok(code) => render::warning(theme, &format!("command exited with {code:?}")),
        Err(WirelessError::Cancelled) => render::warning(theme, "cancelled"),
        Err(err) => return Err(anyhow::Error::new(err).context("running airmon-ng")),
    }
    Ok(())
}

fn cmd_scan(
    theme: &Theme,
    config: &Config,
    iface: Option<String>,
    band: Band,
    duration: Option<u64>,
) -> Result<()> {
    let iface = match iface {
        Some(iface) => iface,
        None => interface::preferred_interface()
            .context("detecting wireless interfaces")?
            .context("no wireless interface found; pass --interface")?,
    };

    let (tx, rx) = channel();
    let mut ingestor = ScanIngestor::new(config.clone(), tx);
    let cancel = install_ctrl_c()?;

    ingestor
        .start(&iface, band)
        .context("starting scan capture")?;
    render::info(
        theme,
        &format!("scan running on {iface} ({band}) -- Ctrl-C to stop"),
    );

    let deadline = duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    'drain: loop {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break;
            }
        }

        let mut batch = Vec::new();
        if let Some(event) = rx.recv_timeout(DRAIN_TICK) {
            batch.push(event);
            batch.extend(rx.drain());
        }
        for event in &batch {
            render::scan_event(theme, event);
            if matches!(event, ScanEvent::CaptureExited { .. }) {
                break 'drain;
            }
        }
    }

    ingestor.stop().context("stopping scan")?;
    let (networks, clients) = ingestor.snapshot();
    render::scan_summary(theme, &networks, &clients);
    Ok(())
}

fn cmd_capture(
    theme: &Theme,
    config: &Config,
    bssid: &str,
    channel_nr: i32,
    name: &str,
    iface: &str,
) -> Result<()> {
    let bssid: MacAddress = bssid
        .trim()
        .parse()
        .context("target BSSID is not a valid hardware address")?;

    let (tx, rx) = channel();
    let mut session = CaptureSession::new(config.clone(), tx);
    let cancel = install_ctrl_c()?;

    let prefix = session
        .start(bssid, channel_nr, name, iface)
        .context("starting handshake capture")?;
    render::info(
        theme,
        &format!(
            "capturing {} on channel {} -> {}-01.cap (Ctrl-C to stop)",
            bssid,
            channel_nr,
            prefix.display()
        ),
    );

    pump_session(theme, &rx, &cancel, || Ok(session.stop()?))
}

fn cmd_deauth(
    theme: &Theme,
    config: &Config,
    bssid: &str,
    client: Option<&str>,
    channel_nr: Option<i32>,
    iface: &str,
) -> Result<()> {
    let (tx, rx) = channel();
    let mut session = DeauthSession::new(config, tx);
    let cancel = install_ctrl_c()?;

    match channel_nr {
        Some(channel_nr) => session
            .start_on_channel(bssid, client, channel_nr, iface)
            .context("starting deauth")?,
        None => session.start(bssid, client, iface).context("starting deauth")?,
    }

    let target = client.unwrap_or("all clients");
    render::info(
        theme,
        &format!("deauth running against {bssid} [{target}] -- Ctrl-C to stop"),
    );

    pump_session(theme, &rx, &cancel, || Ok(session.stop()?))
}

fn cmd_crack(
    theme: &Theme,
    config: &Config,
    cap: &Path,
    wordlist: Option<&Path>,
) -> Result<()> {
    let (tx, rx) = channel();
    let mut session = CrackSession::new(config.clone(), tx);
    let cancel = install_ctrl_c()?;

    session.start(cap, wordlist).context("starting aircrack-ng")?;
    render::info(theme, &format!("cracking {} -- Ctrl-C to stop", cap.display()));

    pump_session(theme, &rx, &cancel, || Ok(session.stop()?))
}

fn cmd_convert(
    theme: &Theme,
    config: &Config,
    cap: &Path,
    format: ConvertFormat,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let out_dir = out_dir.unwrap_or_else(|| config.captured_dir.clone());
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let supervisor = ProcessSupervisor::new(config.stop_timeout);
    let cancel = install_ctrl_c()?;
    let theme_copy = *theme;
    let on_event = move |event: ProcessEvent| {
        if let ProcessEvent::Line(line) = event {
            render::raw(&theme_copy, &line);
        }
    };

    let out = match format {
        ConvertFormat::Hashcat => {
            crack::convert_to_hashcat(&supervisor, cap, &out_dir, Some(&cancel), on_event)
        }
        ConvertFormat::John => {
            crack::convert_to_john(&supervisor, cap, &out_dir, Some(&cancel), on_event)
        }
    }
    .context("converting capture")?;

    render::success(theme, &format!("saved {}", out.display()));
    Ok(())
}

/// Drain session events until the terminal one, stopping the session when
/// Ctrl-C fires.
fn pump_session<F>(
    theme: &Theme,
    rx: &EventReceiver<SessionEvent>,
    cancel: &CancelFlag,
    mut stop: F,
) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    let mut stopping = false;
    loop {
        if cancel.load(Ordering::Relaxed) && !stopping {
            stopping = true;
            stop()?;
        }

        match rx.recv_timeout(DRAIN_TICK) {
            Some(event) => {
                let terminal = matches!(
                    event,
                    SessionEvent::Completed { .. } | SessionEvent::Failed { .. }
                );
                render::session_event(theme, &event);
                if terminal {
                    break;
                }
            }
            None if stopping => break,
            None => {}
        }
    }
    Ok(())
}
