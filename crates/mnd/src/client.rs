//! Resilient socket client, one per monitored channel.
//!
//! Each [`SocketClient`] owns exactly one connection to one local socket
//! endpoint and runs the lifecycle
//!
//! ```text
//! Disconnected → Connecting → Connected → (ReadError | PeerClosed)
//!                    ▲                          │
//!                    └──────── Reconnecting ◀───┘
//!                                   │
//!                                   ▼ (budget exhausted)
//!                                GaveUp (terminal)
//! ```
//!
//! Connect failures retry on the fixed backoff schedule; read faults are
//! counted but do not tear the socket down; a peer close triggers a
//! reconnect within the same retry budget. Only exhaustion of the retry or
//! error budget ends the worker, and that outcome is reported through the
//! returned [`ClientExit`] rather than an error - nothing here can crash
//! the process.
//!
//! **Panic-Free Policy:** no `.unwrap()`, `.expect()`, `panic!()`,
//! `unreachable!()`, or `todo!()` outside tests.

use std::io::ErrorKind;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use mn_core::channel::{encode_line, SUBSCRIBE_WCN_DUMP};
use mn_core::{ChannelConfig, ChannelError, ChannelResult, RetryPolicy};

/// Fixed read buffer size; daemon messages are short status lines.
pub const READ_BUF_SIZE: usize = 512;

/// Read errors tolerated on one connection before the worker stops.
pub const MAX_READ_ERRORS: u32 = 10;

/// Callback receiving each non-empty decoded chunk.
pub type ChunkHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Why a worker stopped. The only values a worker can ever resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientExit {
    /// Cooperative shutdown via the cancellation token.
    Cancelled,
    /// Connect retry budget exhausted; terminal for this channel.
    RetryBudgetExhausted,
    /// Too many read errors on one connection; terminal for this channel.
    ErrorBudgetExhausted,
}

/// Mutable per-connection counters, owned exclusively by the worker.
#[derive(Debug, Default)]
struct ConnectionState {
    /// Consecutive failed connect attempts; reset to 0 on success.
    retry_count: u32,
    /// Read faults on the current lifetime; reset only on reconnect.
    error_count: u32,
}

/// Client for one monitored channel socket.
///
/// Results never return to the caller directly: every decoded chunk goes to
/// the handler, and the terminal status comes out of [`run`](Self::run).
pub struct SocketClient {
    config: ChannelConfig,
    policy: RetryPolicy,
    handler: ChunkHandler,
    cancel_token: CancellationToken,
}

impl SocketClient {
    pub fn new(
        config: ChannelConfig,
        policy: RetryPolicy,
        handler: ChunkHandler,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            policy,
            handler,
            cancel_token,
        }
    }

    /// Runs the worker until give-up or cancellation.
    ///
    /// Connects (with retry), then reads in a loop, forwarding decoded
    /// chunks to the handler synchronously. Reconnects on peer close within
    /// the retry budget. The socket handle is dropped on every exit path.
    pub async fn run(self) -> ClientExit {
        info!(
            channel = %self.config.name,
            endpoint = %self.config.endpoint.display(),
            "channel worker starting"
        );

        let mut state = ConnectionState::default();

        let mut stream = match self.connect_with_retry(&mut state).await {
            Ok(stream) => stream,
            Err(exit) => return self.finish(exit, &state),
        };

        let mut buf = [0u8; READ_BUF_SIZE];

        loop {
            if self.cancel_token.is_cancelled() {
                return self.finish(ClientExit::Cancelled, &state);
            }
            if let Some(exit) = self.budget_exhausted(&state) {
                return self.finish(exit, &state);
            }

            let read = tokio::select! {
                read = stream.read(&mut buf) => read,
                _ = self.cancel_token.cancelled() => {
                    return self.finish(ClientExit::Cancelled, &state);
                }
            };

            match read {
                Ok(0) => {
                    info!(channel = %self.config.name, error = %self.peer_closed(), "peer closed connection");
                    drop(stream);
                    stream = match self.reconnect(&mut state).await {
                        Ok(stream) => stream,
                        Err(exit) => return self.finish(exit, &state),
                    };
                }
                Ok(count) => {
                    debug!(channel = %self.config.name, bytes = count, "read chunk");
                    self.handle_chunk(&buf[..count]);
                }
                Err(e) if is_disconnect(&e) => {
                    info!(channel = %self.config.name, error = %e, "connection lost");
                    drop(stream);
                    stream = match self.reconnect(&mut state).await {
                        Ok(stream) => stream,
                        Err(exit) => return self.finish(exit, &state),
                    };
                }
                Err(source) => {
                    // A single faulted read call does not tear the socket
                    // down; only persistent failure matters.
                    state.error_count += 1;
                    let err = ChannelError::Read {
                        endpoint: self.endpoint_str(),
                        source,
                    };
                    warn!(
                        channel = %self.config.name,
                        error = %err,
                        error_count = state.error_count,
                        "read failed, continuing"
                    );
                }
            }
        }
    }

    /// Decodes one read's worth of bytes and forwards non-empty text.
    ///
    /// A chunk that is not valid UTF-8 is dropped (logged, not counted
    /// toward give-up). No buffering happens across reads, so a keyword
    /// split between two reads is missed.
    fn handle_chunk(&self, bytes: &[u8]) {
        match std::str::from_utf8(bytes) {
            Ok(text) if text.is_empty() => {}
            Ok(text) => {
                debug!(channel = %self.config.name, text, "forwarding chunk");
                (self.handler)(text);
            }
            Err(_) => {
                let err = ChannelError::Decode {
                    endpoint: self.endpoint_str(),
                };
                warn!(channel = %self.config.name, error = %err, "dropping undecodable chunk");
            }
        }
    }

    /// Reconnects after a peer close.
    ///
    /// The budget is consulted BEFORE attempting: a channel that has already
    /// consumed its full retry budget gives up here rather than burning a
    /// doomed extra connect.
    async fn reconnect(&self, state: &mut ConnectionState) -> Result<UnixStream, ClientExit> {
        if self.gives_up_on_reconnect(state.retry_count) {
            error!(
                channel = %self.config.name,
                retry_count = state.retry_count,
                "retry budget already consumed, not reconnecting"
            );
            return Err(ClientExit::RetryBudgetExhausted);
        }
        // Fresh connection, fresh error budget.
        state.error_count = 0;
        self.connect_with_retry(state).await
    }

    /// True when a peer close must end the worker instead of reconnecting.
    fn gives_up_on_reconnect(&self, retry_count: u32) -> bool {
        self.policy.should_give_up(retry_count + 1)
    }

    /// Attempts to connect, retrying on the backoff schedule.
    ///
    /// On success sends the channel's init line(s) and resets `retry_count`
    /// to 0. Gives up permanently once the attempt count exceeds the budget.
    async fn connect_with_retry(
        &self,
        state: &mut ConnectionState,
    ) -> Result<UnixStream, ClientExit> {
        loop {
            if self.cancel_token.is_cancelled() {
                return Err(ClientExit::Cancelled);
            }

            match self.connect_once().await {
                Ok(mut stream) => {
                    self.send_init_lines(&mut stream).await;
                    state.retry_count = 0;
                    info!(channel = %self.config.name, "connected");
                    return Ok(stream);
                }
                Err(err) => {
                    state.retry_count += 1;
                    if self.policy.should_give_up(state.retry_count) {
                        error!(
                            channel = %self.config.name,
                            attempts = state.retry_count,
                            "still cannot connect, giving up for good"
                        );
                        return Err(ClientExit::RetryBudgetExhausted);
                    }

                    let delay = self.policy.next_delay(state.retry_count);
                    warn!(
                        channel = %self.config.name,
                        error = %err,
                        attempt = state.retry_count,
                        delay_ms = delay.as_millis() as u64,
                        "connect failed, will retry"
                    );

                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = self.cancel_token.cancelled() => {
                            return Err(ClientExit::Cancelled);
                        }
                    }
                }
            }
        }
    }

    /// Sends the configured init line, plus the fixed WCN dump subscription
    /// for the one channel that requires it.
    ///
    /// Send failures are logged and ignored: the connection is still usable
    /// for reading, and the daemon may simply not honor subscriptions.
    async fn send_init_lines(&self, stream: &mut UnixStream) {
        if let Some(line) = self.config.init_line() {
            self.send_line(stream, &line).await;
        }
        if self.config.wants_wcn_dump_subscription() {
            self.send_line(stream, &encode_line(SUBSCRIBE_WCN_DUMP)).await;
        }
    }

    async fn send_line(&self, stream: &mut UnixStream, line: &[u8]) {
        if let Err(e) = stream.write_all(line).await {
            warn!(channel = %self.config.name, error = %e, "failed to send init line");
            return;
        }
        if let Err(e) = stream.flush().await {
            warn!(channel = %self.config.name, error = %e, "failed to flush init line");
        }
    }

    /// The `needStopSocket` check, consulted before every read.
    fn budget_exhausted(&self, state: &ConnectionState) -> Option<ClientExit> {
        if self.policy.should_give_up(state.retry_count) {
            return Some(ClientExit::RetryBudgetExhausted);
        }
        if state.error_count > MAX_READ_ERRORS {
            return Some(ClientExit::ErrorBudgetExhausted);
        }
        None
    }

    fn finish(&self, exit: ClientExit, state: &ConnectionState) -> ClientExit {
        match exit {
            ClientExit::Cancelled => {
                info!(channel = %self.config.name, "channel worker cancelled");
            }
            ClientExit::RetryBudgetExhausted => {
                let err = ChannelError::RetryBudgetExhausted {
                    endpoint: self.endpoint_str(),
                    attempts: state.retry_count,
                };
                error!(channel = %self.config.name, error = %err, "channel worker giving up permanently");
            }
            ClientExit::ErrorBudgetExhausted => {
                let err = ChannelError::ErrorBudgetExhausted {
                    endpoint: self.endpoint_str(),
                    errors: state.error_count,
                };
                error!(channel = %self.config.name, error = %err, "channel worker giving up permanently");
            }
        }
        exit
    }

    /// One connect attempt against the channel endpoint.
    async fn connect_once(&self) -> ChannelResult<UnixStream> {
        UnixStream::connect(&self.config.endpoint)
            .await
            .map_err(|source| ChannelError::Connect {
                endpoint: self.endpoint_str(),
                source,
            })
    }

    fn peer_closed(&self) -> ChannelError {
        ChannelError::PeerClosed {
            endpoint: self.endpoint_str(),
        }
    }

    fn endpoint_str(&self) -> String {
        self.config.endpoint.display().to_string()
    }
}

/// Errors that mean the peer is gone, as opposed to a transient read fault.
fn is_disconnect(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected
    )
}
