//! Daemon settings, constructed once at startup and passed down.
//!
//! The settings replace what the original platform service read ad hoc from
//! global system properties: everything is resolved here, at process start,
//! from an optional TOML file plus environment overrides, and the resulting
//! value is handed to the components that need it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable overriding the socket directory.
pub const ENV_SOCKET_DIR: &str = "MN_SOCKET_DIR";

/// Environment variable for the SSDA dump subscription mode token.
pub const ENV_SSDA_MODE: &str = "MN_SSDA_MODE";

/// Environment variable suppressing the modem-assert alert (the platform
/// resets the modem itself, so the alert would be noise). Set to `1`.
pub const ENV_MODEM_RESET: &str = "MN_MODEM_RESET";

/// Environment variable disabling all alert presentation. Set to `0`.
pub const ENV_ALERTS: &str = "MN_ALERTS";

const DEFAULT_SOCKET_DIR: &str = "/dev/socket";
const DEFAULT_SSDA_MODE: &str = "5MODE";

/// Errors loading the settings file.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Directory holding the daemons' Unix sockets.
    pub socket_dir: PathBuf,

    /// Mode token for the `slogmodem` dump subscription command.
    pub ssda_mode: String,

    /// When set, the platform auto-resets the modem on assert and the
    /// modem-assert alert is not shown. The state broadcast still goes out.
    pub suppress_modem_assert_alert: bool,

    /// Master switch for the alert-presentation surface.
    pub alerts_enabled: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            socket_dir: PathBuf::from(DEFAULT_SOCKET_DIR),
            ssda_mode: DEFAULT_SSDA_MODE.to_string(),
            suppress_modem_assert_alert: false,
            alerts_enabled: true,
        }
    }
}

impl MonitorSettings {
    /// Loads settings from an optional TOML file, then applies environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Parses settings from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies overrides from a key lookup (the environment in production,
    /// a closure in tests).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_SOCKET_DIR) {
            debug!(key = ENV_SOCKET_DIR, value = %dir, "override applied");
            self.socket_dir = PathBuf::from(dir);
        }
        if let Some(mode) = lookup(ENV_SSDA_MODE) {
            debug!(key = ENV_SSDA_MODE, value = %mode, "override applied");
            self.ssda_mode = mode;
        }
        if let Some(value) = lookup(ENV_MODEM_RESET) {
            debug!(key = ENV_MODEM_RESET, value = %value, "override applied");
            self.suppress_modem_assert_alert = value == "1";
        }
        if let Some(value) = lookup(ENV_ALERTS) {
            debug!(key = ENV_ALERTS, value = %value, "override applied");
            self.alerts_enabled = value != "0";
        }
    }
}
