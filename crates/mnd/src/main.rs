//! Modem notifier daemon - baseband and connectivity monitor
//!
//! This binary runs as a background daemon, connecting to the local sockets
//! of the modem, log, and connectivity system daemons and reacting to the
//! messages they emit.
//!
//! # Usage
//!
//! ```bash
//! # Start the daemon (foreground)
//! mnd start
//!
//! # Start the daemon (background/daemonized)
//! mnd start -d
//!
//! # Start with a settings file
//! mnd start --config /etc/mn.toml
//!
//! # Stop the daemon
//! mnd stop
//!
//! # Check daemon status
//! mnd status
//!
//! # Point at a different socket directory
//! MN_SOCKET_DIR=/tmp/sockets mnd start
//!
//! # Enable debug logging
//! RUST_LOG=mnd=debug mnd start
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: Graceful shutdown

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mn_core::{standard_channels, MonitorSettings, RetryPolicy};
use mnd::alert::{AlertBoard, LogPresenter};
use mnd::broadcast::{spawn_log_subscriber, StateBus};
use mnd::client::ClientExit;
use mnd::health::spawn_health_task;
use mnd::progress::{spawn_progress_task, LogProgress};
use mnd::router::EventRouter;
use mnd::supervisor::Supervisor;

/// Modem notifier daemon - baseband and connectivity monitor
#[derive(Parser, Debug)]
#[command(name = "mnd", version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the daemon
    Start {
        /// Run as a background daemon (fork to background)
        #[arg(short = 'd', long)]
        daemon: bool,

        /// Path to a TOML settings file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
}

fn pid_file_path() -> PathBuf {
    let state_dir = dirs::state_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("mn");
    state_dir.join("mnd.pid")
}

fn log_file_path() -> PathBuf {
    let state_dir = dirs::state_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("mn");
    state_dir.join("mnd.log")
}

fn read_pid() -> Option<u32> {
    let path = pid_file_path();
    let mut file = File::open(&path).ok()?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}

fn write_pid() -> Result<()> {
    let path = pid_file_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create state directory")?;
    }
    let mut file = File::create(&path).context("Failed to create PID file")?;
    write!(file, "{}", process::id()).context("Failed to write PID")?;
    Ok(())
}

fn remove_pid_file() {
    let path = pid_file_path();
    let _ = fs::remove_file(path);
}

fn is_process_running(pid: u32) -> bool {
    PathBuf::from(format!("/proc/{pid}")).exists()
}

fn is_daemon_running() -> Option<u32> {
    if let Some(pid) = read_pid() {
        if is_process_running(pid) {
            return Some(pid);
        }
        remove_pid_file();
    }
    None
}

fn stop_daemon(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        let result = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
        if result != 0 {
            bail!("Failed to send SIGTERM to process {pid}");
        }
    }
    #[cfg(not(unix))]
    {
        bail!("Stop command is only supported on Unix systems");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let command = args.command.unwrap_or(Command::Start {
        daemon: false,
        config: None,
    });

    match command {
        Command::Start { daemon, config } => {
            if let Some(pid) = is_daemon_running() {
                eprintln!("Daemon is already running (PID {pid})");
                eprintln!("Use 'mnd stop' to stop it first.");
                process::exit(1);
            }

            if daemon {
                daemonize()?;
            }

            write_pid()?;

            let result = run_daemon(config);

            remove_pid_file();

            result
        }
        Command::Stop => {
            if let Some(pid) = is_daemon_running() {
                println!("Stopping daemon (PID {pid})...");
                stop_daemon(pid)?;

                for _ in 0..50 {
                    if !is_process_running(pid) {
                        println!("Daemon stopped.");
                        return Ok(());
                    }
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }

                eprintln!("Daemon did not stop within 5 seconds.");
                process::exit(1);
            } else {
                println!("Daemon is not running.");
                Ok(())
            }
        }
        Command::Status => {
            if let Some(pid) = is_daemon_running() {
                println!("Daemon is running (PID {pid})");
                Ok(())
            } else {
                println!("Daemon is not running.");
                process::exit(1);
            }
        }
    }
}

fn daemonize() -> Result<()> {
    use daemonize::Daemonize;

    let log_path = log_file_path();

    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).context("Failed to create log directory")?;
    }

    let stdout = File::create(&log_path).context("Failed to create log file for stdout")?;
    let stderr = File::create(&log_path).context("Failed to create log file for stderr")?;

    let daemonize = Daemonize::new()
        .working_directory("/")
        .stdout(stdout)
        .stderr(stderr);

    daemonize.start().context("Failed to daemonize")?;

    Ok(())
}

/// Runs the daemon (async entry point).
#[tokio::main]
async fn run_daemon(config: Option<PathBuf>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("mnd=info".parse()?)
                .add_directive("mn_core=info".parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "modem notifier daemon starting"
    );

    let settings =
        MonitorSettings::load(config.as_deref()).context("Failed to load settings")?;
    info!(
        socket_dir = %settings.socket_dir.display(),
        ssda_mode = %settings.ssda_mode,
        suppress_modem_assert_alert = settings.suppress_modem_assert_alert,
        alerts_enabled = settings.alerts_enabled,
        "settings loaded"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    // External surfaces: log-backed presenters until a platform UI is wired.
    let alerts = Arc::new(AlertBoard::new(
        Arc::new(LogPresenter),
        settings.alerts_enabled,
    ));
    let bus = StateBus::new();
    let _bus_logger = spawn_log_subscriber(&bus, cancel_token.clone());
    let (progress, _progress_task) =
        spawn_progress_task(Arc::new(LogProgress), cancel_token.clone());

    let router = EventRouter::new(alerts, bus, progress, &settings);

    let channels = standard_channels(&settings.socket_dir, &settings.ssda_mode);
    let supervisor = Supervisor::spawn(
        channels,
        RetryPolicy::default(),
        router,
        &cancel_token,
    );
    info!(workers = supervisor.worker_count(), "channel workers started");

    let _health_task = spawn_health_task(supervisor.status_board(), cancel_token.clone());

    // Workers only finish by giving up or by shutdown; either way the
    // daemon's job is done when they are all terminal.
    let results = supervisor.join_all().await;
    for (channel, exit) in &results {
        match exit {
            ClientExit::Cancelled => info!(channel = %channel, "worker stopped by shutdown"),
            ClientExit::RetryBudgetExhausted | ClientExit::ErrorBudgetExhausted => {
                error!(channel = %channel, exit = ?exit, "worker gave up before shutdown");
            }
        }
    }

    info!("modem notifier daemon stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
