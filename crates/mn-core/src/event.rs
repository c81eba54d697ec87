//! Domain events and alert identities.
//!
//! A [`DomainEvent`] is produced once per classified chunk and consumed once
//! by the event router. [`AlertKind`] carries the stable numeric identities
//! the alert-presentation surface keys on for idempotent show/cancel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::ChannelKind;

/// One classified message from a monitored channel.
///
/// `Alive` and `Assert` keep the originating channel kind because the router
/// clears and raises different alerts for the modem and connectivity
/// subsystems. The raw text rides along untouched so the presentation
/// surfaces can show exactly what the daemon said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    /// Subsystem reported itself healthy.
    Alive(ChannelKind, String),
    /// Subsystem crashed / asserted.
    Assert(ChannelKind, String),
    /// Modem is blocked (wedged, not asserted).
    Blocked(String),
    /// Audio DSP asserted.
    AgdspAssert(String),
    /// Diagnostic dump started.
    DumpStart,
    /// Diagnostic dump finished.
    DumpEnd,
    /// Chunk matched nothing in the vocabulary.
    Unrecognized,
}

/// The four persistent alert categories, with their fixed presentation ids.
///
/// The ids are part of the external contract with the presentation surface:
/// showing the same id twice must update the existing alert, not stack a
/// second one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    ModemAssert,
    WcnAssert,
    ModemBlock,
    AgdspAssert,
}

impl AlertKind {
    /// Stable numeric identity used by the presentation surface.
    pub fn id(self) -> u32 {
        match self {
            AlertKind::ModemAssert => 1,
            AlertKind::WcnAssert => 2,
            AlertKind::ModemBlock => 3,
            AlertKind::AgdspAssert => 4,
        }
    }

    /// Title shown on the alert for this kind.
    pub fn title(self) -> &'static str {
        match self {
            AlertKind::ModemAssert => "modem assert",
            AlertKind::WcnAssert => "wcnd assert",
            AlertKind::ModemBlock => "modem block",
            AlertKind::AgdspAssert => "agdsp assert",
        }
    }
}

/// Coarse subsystem state carried on the outward broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoarseState {
    Alive,
    Assert,
}

impl CoarseState {
    pub fn as_str(self) -> &'static str {
        match self {
            CoarseState::Alive => "alive",
            CoarseState::Assert => "assert",
        }
    }
}

/// Payload published on the state bus when a subsystem changes state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    /// Which channel observed the change.
    pub subsystem: ChannelKind,
    /// Coarse state token (`alive` / `assert`).
    pub state: CoarseState,
    /// Raw message text as read from the socket.
    pub message: String,
    /// When the daemon observed the message.
    pub at: DateTime<Utc>,
}

impl StateChange {
    pub fn new(subsystem: ChannelKind, state: CoarseState, message: impl Into<String>) -> Self {
        Self {
            subsystem,
            state,
            message: message.into(),
            at: Utc::now(),
        }
    }
}
