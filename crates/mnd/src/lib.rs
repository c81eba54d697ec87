//! Modem notifier daemon.
//!
//! This crate provides the daemon's moving parts:
//! - `client` - Resilient socket client, one per monitored channel
//! - `router` - Maps domain events onto the external surfaces
//! - `alert` - Id-keyed alert state with idempotent show/hide
//! - `broadcast` - Outward state-change bus
//! - `progress` - Single-consumer hand-off for the dump progress indicator
//! - `supervisor` - Owns the channel workers and their terminal statuses
//! - `health` - Periodic resource and worker-status logging
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   chunk    ┌────────────┐   DomainEvent   ┌─────────────┐
//! │ SocketClient │───────────▶│ classifier │────────────────▶│ EventRouter │
//! │ (per channel)│            └────────────┘                 └──────┬──────┘
//! └──────────────┘                                                  │
//!        × 3 workers                    ┌──────────────┬────────────┼──────┐
//!                                       ▼              ▼            ▼      │
//!                                  AlertBoard      StateBus    ProgressHandle
//!                                  (show/hide)    (broadcast)  (mpsc → actor)
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Socket and channel failures are contained inside the worker that hit them

pub mod alert;
pub mod broadcast;
pub mod client;
pub mod health;
pub mod progress;
pub mod router;
pub mod supervisor;
