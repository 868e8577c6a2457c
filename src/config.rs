//! Harness configuration
//!
//! Layered with figment: built-in defaults, then an optional `ircprobe.toml`,
//! then `IRCPROBE_*` environment variables.

use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default config file looked up in the working directory
pub const CONFIG_FILE: &str = "ircprobe.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "IRCPROBE_";

/// Display name sent in USER when none is given
pub const DEFAULT_DISPLAY_NAME: &str = "Test Client";

/// Process-wide defaults for every test client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    /// Budget for connect + registration
    pub connect_timeout_ms: u64,
    /// Default budget for a single wait
    pub wait_timeout_ms: u64,
    /// Buffered lines included in a raw-timeout error
    pub history_window: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            host: "nefarious".to_string(),
            port: 6667,
            tls: false,
            connect_timeout_ms: 10_000,
            wait_timeout_ms: 5_000,
            history_window: 20,
        }
    }
}

impl HarnessConfig {
    /// Defaults, `ircprobe.toml` if present, then environment
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    /// Same as `load` with an explicit file path (missing file is fine)
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::figment(path).extract()?)
    }

    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(HarnessConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Client options for `nick` using these defaults
    pub fn client(&self, nick: impl Into<String>) -> ClientConfig {
        ClientConfig {
            host: self.host.clone(),
            port: self.port,
            nick: nick.into(),
            username: None,
            display_name: None,
            tls: self.tls,
            connect_timeout: self.connect_timeout(),
            wait_timeout: self.wait_timeout(),
            history_window: self.history_window,
        }
    }
}

/// Connect options for one test client. Only the nick is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub nick: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub tls: bool,
    pub connect_timeout: Duration,
    pub wait_timeout: Duration,
    pub history_window: usize,
}

impl ClientConfig {
    /// Options for `nick` with built-in defaults (no file/env lookup)
    pub fn new(nick: impl Into<String>) -> Self {
        HarnessConfig::default().client(nick)
    }

    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Username, falling back to the nick
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.nick)
    }

    /// Display name (realname/gecos), falling back to a fixed placeholder
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(DEFAULT_DISPLAY_NAME)
    }
}
