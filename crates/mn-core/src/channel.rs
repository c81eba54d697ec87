//! Monitored channel configuration.
//!
//! One [`ChannelConfig`] per local socket endpoint, created at process start
//! and never mutated. The three standard channels mirror the system daemons
//! we monitor: `modemd` (modem state), `slogmodem` (dump notifications), and
//! `wcnd` (connectivity state).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Socket name of the modem state daemon.
pub const MODEM_SOCKET_NAME: &str = "modemd";

/// Socket name of the modem log / dump daemon.
pub const SLOG_SOCKET_NAME: &str = "slogmodem";

/// Socket name of the connectivity (WCN) daemon.
pub const WCN_SOCKET_NAME: &str = "wcnd";

/// Which classification vocabulary a channel uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Baseband processor state (`modemd`).
    Modem,
    /// Modem log daemon dump notifications (`slogmodem`).
    SystemLog,
    /// WCN connectivity subsystem (`wcnd`).
    Connectivity,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Modem => "modem",
            ChannelKind::SystemLog => "system_log",
            ChannelKind::Connectivity => "connectivity",
        }
    }
}

/// Immutable description of one monitored channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Short name, also the socket file name (e.g. `modemd`).
    pub name: String,

    /// Path of the Unix socket to connect to.
    pub endpoint: PathBuf,

    /// Optional line transmitted once after each successful connect.
    pub init_message: Option<String>,

    /// Classification vocabulary for this channel.
    pub kind: ChannelKind,
}

impl ChannelConfig {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<PathBuf>,
        init_message: Option<String>,
        kind: ChannelKind,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            init_message,
            kind,
        }
    }

    /// Encodes the configured init message as a newline-terminated UTF-8 line.
    ///
    /// Returns `None` when no init message is configured or it is empty,
    /// matching the "send nothing" channels.
    pub fn init_line(&self) -> Option<Vec<u8>> {
        let msg = self.init_message.as_deref()?;
        if msg.is_empty() {
            return None;
        }
        Some(encode_line(msg))
    }

    /// True for the one channel that must also subscribe to WCN dumps on
    /// every connect, regardless of its configured init message.
    pub fn wants_wcn_dump_subscription(&self) -> bool {
        self.name == SLOG_SOCKET_NAME
    }
}

/// Encodes a command line for transmission: UTF-8 bytes plus trailing `\n`.
pub fn encode_line(msg: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(msg.len() + 1);
    buf.extend_from_slice(msg.as_bytes());
    buf.push(b'\n');
    buf
}

/// Builds the dump subscription command for the given mode token.
pub fn subscribe_dump_command(mode: &str) -> String {
    format!("SUBSCRIBE {mode} DUMP")
}

/// The fixed second line sent to `slogmodem` on every connect.
pub const SUBSCRIBE_WCN_DUMP: &str = "SUBSCRIBE WCN DUMP";

/// Builds the three standard channel configs.
///
/// * `modemd` — no init message.
/// * `slogmodem` — subscribes to dumps for the configured SSDA mode.
/// * `wcnd` — no init message.
///
/// Socket paths are `<socket_dir>/<name>`.
pub fn standard_channels(socket_dir: &Path, ssda_mode: &str) -> Vec<ChannelConfig> {
    vec![
        ChannelConfig::new(
            MODEM_SOCKET_NAME,
            socket_dir.join(MODEM_SOCKET_NAME),
            None,
            ChannelKind::Modem,
        ),
        ChannelConfig::new(
            SLOG_SOCKET_NAME,
            socket_dir.join(SLOG_SOCKET_NAME),
            Some(subscribe_dump_command(ssda_mode)),
            ChannelKind::SystemLog,
        ),
        ChannelConfig::new(
            WCN_SOCKET_NAME,
            socket_dir.join(WCN_SOCKET_NAME),
            None,
            ChannelKind::Connectivity,
        ),
    ]
}
