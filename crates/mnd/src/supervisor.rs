//! Owns the channel workers and their terminal statuses.
//!
//! The supervisor spawns exactly one [`SocketClient`] task per configured
//! channel at startup. Workers run concurrently and independently; the only
//! thing they share is the event router. Each worker's task handle is owned
//! here, so a worker that gives up is observed rather than silently leaked:
//! its terminal status lands on the [`StatusBoard`] the moment it exits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use mn_core::{classify, ChannelConfig, RetryPolicy};

use crate::client::{ChunkHandler, ClientExit, SocketClient};
use crate::router::EventRouter;

/// Shared record of workers that have reached a terminal state.
///
/// Cheap to clone; written by each worker task as it exits and read by the
/// health task. A worker absent from the board is still running.
#[derive(Clone, Default)]
pub struct StatusBoard {
    inner: Arc<Mutex<HashMap<String, ClientExit>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, channel: &str, exit: ClientExit) {
        self.lock_inner().insert(channel.to_string(), exit);
    }

    /// Terminal statuses recorded so far, sorted by channel name.
    pub fn snapshot(&self) -> Vec<(String, ClientExit)> {
        let mut entries: Vec<_> = self
            .lock_inner()
            .iter()
            .map(|(name, exit)| (name.clone(), *exit))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Channels that stopped because a budget ran out (designed degradation).
    pub fn gave_up(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .lock_inner()
            .iter()
            .filter(|(_, exit)| {
                matches!(
                    exit,
                    ClientExit::RetryBudgetExhausted | ClientExit::ErrorBudgetExhausted
                )
            })
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn lock_inner(&self) -> MutexGuard<'_, HashMap<String, ClientExit>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

struct Worker {
    name: String,
    handle: JoinHandle<ClientExit>,
}

/// Spawns and owns one worker per monitored channel.
pub struct Supervisor {
    workers: Vec<Worker>,
    status: StatusBoard,
}

impl Supervisor {
    /// Starts one worker per channel config. Called once at process start.
    pub fn spawn(
        channels: Vec<ChannelConfig>,
        policy: RetryPolicy,
        router: EventRouter,
        cancel_token: &CancellationToken,
    ) -> Self {
        let status = StatusBoard::new();
        let workers = channels
            .into_iter()
            .map(|config| {
                let name = config.name.clone();
                let kind = config.kind;
                let router = router.clone();
                let handler: ChunkHandler =
                    Arc::new(move |chunk: &str| router.route(classify(kind, chunk)));

                let client = SocketClient::new(
                    config,
                    policy.clone(),
                    handler,
                    cancel_token.child_token(),
                );

                let board = status.clone();
                let channel = name.clone();
                let handle = tokio::spawn(async move {
                    let exit = client.run().await;
                    board.record(&channel, exit);
                    exit
                });

                Worker { name, handle }
            })
            .collect();

        Self { workers, status }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Shared view of terminal worker statuses, for the health task.
    pub fn status_board(&self) -> StatusBoard {
        self.status.clone()
    }

    /// Names of workers whose tasks have finished, without blocking.
    pub fn finished_workers(&self) -> Vec<&str> {
        self.workers
            .iter()
            .filter(|worker| worker.handle.is_finished())
            .map(|worker| worker.name.as_str())
            .collect()
    }

    /// Awaits every worker and returns their terminal statuses.
    ///
    /// Workers only finish by giving up or by cancellation, so this returns
    /// once all channels are terminal or the process is shutting down.
    pub async fn join_all(self) -> Vec<(String, ClientExit)> {
        let mut results = Vec::with_capacity(self.workers.len());
        for worker in self.workers {
            let exit = match worker.handle.await {
                Ok(exit) => exit,
                Err(e) => {
                    // A worker task that panicked or was aborted counts as
                    // cancelled; its channel simply stops producing events.
                    error!(channel = %worker.name, error = %e, "worker task failed");
                    ClientExit::Cancelled
                }
            };
            info!(channel = %worker.name, exit = ?exit, "worker finished");
            results.push((worker.name, exit));
        }
        results
    }
}
