//! Harness error taxonomy
//!
//! Every failure surfaces as the `Err` of the call that produced it. Messages
//! are meant to be read by a human chasing a flaky integration test, so the
//! timeout variants carry what was being waited for and, for raw patterns,
//! the most recent server traffic.

use std::time::Duration;

use thiserror::Error;

/// Result alias used across the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the harness
#[derive(Debug, Error)]
pub enum Error {
    #[error("connection timeout to {host}:{port}")]
    ConnectTimeout { host: String, port: u16 },

    #[error("connection to {host}:{port} closed before registration{}", detail(.reason))]
    ClosedBeforeRegistration {
        host: String,
        port: u16,
        reason: Option<String>,
    },

    #[error("timeout waiting for event: {event} (after {timeout:?})")]
    EventTimeout { event: String, timeout: Duration },

    #[error("timeout waiting for raw pattern: {pattern} (after {timeout:?})\nReceived:\n{}", .recent.join("\n"))]
    RawTimeout {
        pattern: String,
        timeout: Duration,
        recent: Vec<String>,
    },

    #[error("wait for {what} cancelled: connection closed")]
    Cancelled { what: String },

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl Error {
    /// True for the wait/connect deadline variants
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::ConnectTimeout { .. } | Error::EventTimeout { .. } | Error::RawTimeout { .. }
        )
    }
}

fn detail(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(": {}", reason),
        None => String::new(),
    }
}
