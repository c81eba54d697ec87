//! Core domain types for the modem notifier.
//!
//! This crate is pure domain logic shared by the daemon (`mnd`):
//! retry/backoff policy, channel configuration, message classification,
//! domain events, and settings. No I/O happens here.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod backoff;
pub mod channel;
pub mod classify;
pub mod error;
pub mod event;
pub mod settings;

// Re-exports for convenience
pub use backoff::RetryPolicy;
pub use channel::{standard_channels, ChannelConfig, ChannelKind};
pub use classify::classify;
pub use error::{ChannelError, ChannelResult};
pub use event::{AlertKind, CoarseState, DomainEvent, StateChange};
pub use settings::MonitorSettings;
