//! Periodic health logging for the unattended daemon.
//!
//! The daemon is expected to run for the lifetime of the device with nobody
//! watching, so every minute it logs its own memory footprint and which
//! channel workers, if any, have given up. A channel giving up is a designed
//! degradation with no user-facing error surface; this log line is the one
//! place an engineer pulling logs can see it happened.

use std::process;
use std::time::Duration;

use sysinfo::{Pid, System};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::supervisor::StatusBoard;

/// Memory usage warning threshold in MB. The daemon does almost nothing but
/// hold three sockets; anything near this is a leak.
pub const HIGH_MEMORY_THRESHOLD_MB: u64 = 32;

/// How often to log a health snapshot.
pub const HEALTH_INTERVAL: Duration = Duration::from_secs(60);

/// Samples the daemon's own resource usage.
struct ProcessProbe {
    system: System,
    pid: Pid,
}

impl ProcessProbe {
    fn new() -> Self {
        Self {
            system: System::new(),
            pid: Pid::from_u32(process::id()),
        }
    }

    fn memory_mb(&mut self) -> u64 {
        self.system.refresh_all();
        self.system
            .process(self.pid)
            .map(|p| p.memory() / 1024 / 1024)
            .unwrap_or(0)
    }
}

/// Spawns the health logging task.
///
/// Logs a snapshot every [`HEALTH_INTERVAL`]; warns when memory is above
/// threshold or when any worker has stopped permanently. Cancellation-aware.
pub fn spawn_health_task(
    status: StatusBoard,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut probe = ProcessProbe::new();
        let mut tick = interval(HEALTH_INTERVAL);

        info!(
            interval_secs = HEALTH_INTERVAL.as_secs(),
            memory_threshold_mb = HIGH_MEMORY_THRESHOLD_MB,
            "health task started"
        );

        loop {
            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => {
                    info!("health task shutting down");
                    break;
                }

                _ = tick.tick() => {
                    log_snapshot(&mut probe, &status);
                }
            }
        }

        debug!("health task completed");
    })
}

fn log_snapshot(probe: &mut ProcessProbe, status: &StatusBoard) {
    let memory_mb = probe.memory_mb();
    let gave_up = status.gave_up();

    if !gave_up.is_empty() {
        warn!(
            memory_mb,
            channels = ?gave_up,
            "channel workers have given up; events from these channels stopped"
        );
    } else if memory_mb > HIGH_MEMORY_THRESHOLD_MB {
        warn!(
            memory_mb,
            threshold_mb = HIGH_MEMORY_THRESHOLD_MB,
            "daemon memory usage above threshold"
        );
    } else {
        info!(memory_mb, "daemon healthy");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_reports_own_memory() {
        let mut probe = ProcessProbe::new();
        // The test process is certainly resident; zero would mean the probe
        // failed to find its own PID.
        assert!(probe.memory_mb() > 0);
    }

    #[tokio::test]
    async fn test_health_task_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let handle = spawn_health_task(StatusBoard::new(), cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("health task should stop promptly")
            .unwrap();
    }
}
