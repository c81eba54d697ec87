//! Error taxonomy for channel workers, following panic-free policy.
//!
//! Every variant here stays contained inside the worker that produced it:
//! transient failures are retried or counted, terminal ones end that one
//! worker's lifecycle. Nothing escalates to crash the process.

use thiserror::Error;

/// Errors a channel worker can encounter.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Connect attempt failed (transient, retried per backoff schedule).
    #[error("connect to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// A read call faulted without closing the socket (transient, counted).
    #[error("read from {endpoint} failed: {source}")]
    Read {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Peer closed the connection (triggers the reconnect sequence).
    #[error("peer closed {endpoint}")]
    PeerClosed { endpoint: String },

    /// Chunk was not valid text (dropped, not counted toward give-up).
    #[error("chunk from {endpoint} is not valid UTF-8")]
    Decode { endpoint: String },

    /// Connect retry budget exhausted (terminal for the worker).
    #[error("gave up on {endpoint} after {attempts} connect attempts")]
    RetryBudgetExhausted { endpoint: String, attempts: u32 },

    /// Too many read errors on one connection (terminal for the worker).
    #[error("gave up on {endpoint} after {errors} read errors")]
    ErrorBudgetExhausted { endpoint: String, errors: u32 },
}

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;
