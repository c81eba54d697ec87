//! Single-consumer hand-off for the dump progress indicator.
//!
//! The progress surface must only ever be driven from one designated
//! context, never from a channel worker directly. Workers therefore push
//! [`ProgressRequest`]s onto an mpsc queue through a cheap-clone
//! [`ProgressHandle`], and one spawned consumer drains the queue
//! sequentially and drives the [`ProgressIndicator`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Title shown while a modem dump is in progress.
pub const DUMP_TITLE: &str = "Dumping modem log";

/// Message shown while a modem dump is in progress.
pub const DUMP_MESSAGE: &str = "Collecting diagnostic data, please wait";

/// Request to the progress consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressRequest {
    Start,
    End,
}

/// External dump-progress surface.
///
/// Only the single consumer task ever calls into an implementation, so it
/// does not need to tolerate concurrent invocation, just `Send + Sync`
/// ownership.
pub trait ProgressIndicator: Send + Sync {
    fn start(&self, title: &str, message: &str);
    fn stop(&self);
}

/// Indicator that writes progress transitions to the log.
pub struct LogProgress;

impl ProgressIndicator for LogProgress {
    fn start(&self, title: &str, message: &str) {
        tracing::info!(title, message, "dump progress started");
    }

    fn stop(&self) {
        tracing::info!("dump progress finished");
    }
}

/// Cheap-clone sender side of the progress queue.
#[derive(Clone)]
pub struct ProgressHandle {
    sender: mpsc::UnboundedSender<ProgressRequest>,
}

impl ProgressHandle {
    /// Requests the progress indicator to appear. Fire-and-forget.
    pub fn start(&self) {
        if self.sender.send(ProgressRequest::Start).is_err() {
            warn!("progress consumer gone, dropping start request");
        }
    }

    /// Requests the progress indicator to disappear. Fire-and-forget.
    pub fn end(&self) {
        if self.sender.send(ProgressRequest::End).is_err() {
            warn!("progress consumer gone, dropping end request");
        }
    }
}

/// Spawns the progress consumer task and returns a handle for producers.
///
/// The consumer tracks whether the indicator is currently showing:
/// `Start` while showing and `End` while idle are no-ops, so replayed or
/// duplicated dump notifications cannot stack indicators.
pub fn spawn_progress_task(
    indicator: Arc<dyn ProgressIndicator>,
    cancel_token: CancellationToken,
) -> (ProgressHandle, tokio::task::JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        let mut showing = false;

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!("progress consumer shutting down");
                    break;
                }
                request = receiver.recv() => {
                    match request {
                        Some(ProgressRequest::Start) if !showing => {
                            indicator.start(DUMP_TITLE, DUMP_MESSAGE);
                            showing = true;
                        }
                        Some(ProgressRequest::End) if showing => {
                            indicator.stop();
                            showing = false;
                        }
                        Some(request) => {
                            debug!(request = ?request, showing, "ignoring redundant progress request");
                        }
                        None => break,
                    }
                }
            }
        }

        // Do not leave a stale indicator up across shutdown.
        if showing {
            indicator.stop();
        }
    });

    (ProgressHandle { sender }, task)
}
