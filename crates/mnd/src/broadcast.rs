//! Outward state-change bus.
//!
//! When a subsystem flips between alive and assert, the daemon publishes a
//! [`StateChange`] on a process-wide broadcast channel. Other components
//! subscribe with [`StateBus::subscribe`]; having zero subscribers is normal
//! and not an error.

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use mn_core::{ChannelKind, CoarseState, StateChange};

/// Buffered state changes per subscriber before lagging.
const EVENT_BUFFER: usize = 64;

/// Process-wide broadcast of subsystem state changes.
///
/// Cheap to clone; all clones publish into the same channel. Safe for
/// concurrent publication from multiple channel workers.
#[derive(Clone)]
pub struct StateBus {
    sender: broadcast::Sender<StateChange>,
}

impl StateBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender }
    }

    /// Publishes a state change tagged with the originating subsystem.
    pub fn publish(&self, subsystem: ChannelKind, state: CoarseState, message: &str) {
        let change = StateChange::new(subsystem, state, message);
        debug!(
            subsystem = subsystem.as_str(),
            state = state.as_str(),
            "publishing state change"
        );
        // No receivers is fine; the change is simply dropped.
        let _ = self.sender.send(change);
    }

    /// Subscribes to all future state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StateBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns a task that logs every state change on the bus.
///
/// This is the daemon's own subscriber; external consumers attach their own
/// receivers via [`StateBus::subscribe`].
pub fn spawn_log_subscriber(
    bus: &StateBus,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!("state log subscriber shutting down");
                    break;
                }
                change = receiver.recv() => {
                    match change {
                        Ok(change) => {
                            info!(
                                subsystem = change.subsystem.as_str(),
                                state = change.state.as_str(),
                                message = %change.message,
                                at = %change.at,
                                "subsystem state change"
                            );
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            debug!(missed, "state log subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    })
}
