//! Connection lifecycle state machine
//!
//! Idle -> Connecting -> Registered -> Closed, with Connecting -> Closed for
//! a connection that drops before registration. Closed is terminal.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

/// Where a connection is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Registered,
    Closed,
}

impl ConnectionState {
    fn can_become(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Idle, Connecting) | (Connecting, Registered) | (Connecting, Closed) | (Registered, Closed)
        )
    }
}

/// Shared lifecycle handle; transitions are atomic and observable
#[derive(Debug)]
pub struct Lifecycle {
    tx: watch::Sender<ConnectionState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Idle);
        Self { tx }
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Idle -> Connecting
    pub fn begin_connect(&self) -> bool {
        self.transition(ConnectionState::Connecting)
    }

    /// Connecting -> Registered
    pub fn mark_registered(&self) -> bool {
        self.transition(ConnectionState::Registered)
    }

    /// Connecting/Registered -> Closed. Returns the state that was left, or
    /// `None` if nothing changed (already closed, or never connected).
    pub fn mark_closed(&self) -> Option<ConnectionState> {
        let mut previous = None;
        self.tx.send_if_modified(|state| {
            if state.can_become(ConnectionState::Closed) {
                previous = Some(*state);
                *state = ConnectionState::Closed;
                true
            } else {
                false
            }
        });
        previous
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// Wait until the connection reaches Closed, up to `timeout`
    pub async fn wait_closed(&self, timeout: Duration) -> bool {
        let mut rx = self.tx.subscribe();
        let result =
            tokio::time::timeout(timeout, rx.wait_for(|s| *s == ConnectionState::Closed)).await;
        result.is_ok_and(|closed| closed.is_ok())
    }

    fn transition(&self, next: ConnectionState) -> bool {
        self.tx.send_if_modified(|state| {
            if state.can_become(next) {
                *state = next;
                true
            } else {
                false
            }
        })
    }
}
