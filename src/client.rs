//! TestClient - one simulated IRC user
//!
//! Connects, registers, and then exposes two kinds of operations:
//! - fire-and-forget commands (`join`, `say`, `notice`, `change_nick`, `raw`,
//!   `quit`) that queue a line and return immediately
//! - waits (`wait_for_raw`, `wait_for_event`) that suspend until a matching
//!   line/event shows up or the deadline passes
//!
//! Clients are fully independent: each has its own transport, line buffer
//! and listeners.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::buffer::Line;
use crate::config::ClientConfig;
use crate::connection::{Connection, Event};
use crate::error::{Error, Result};
use crate::lifecycle::{ConnectionState, Lifecycle};
use crate::wait::{self, await_first, Deadline, Inbox, IntoPattern, WaitFailure};

/// How long `disconnect` waits for the server to close after QUIT
pub const QUIT_GRACE: Duration = Duration::from_secs(2);

/// A connected, registered IRC test client
pub struct TestClient {
    config: ClientConfig,
    inbox: Inbox,
    lifecycle: Arc<Lifecycle>,
    connection: Connection,
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClient")
            .field("server", &format!("{}:{}", self.config.host, self.config.port))
            .field("nick", &self.nick())
            .field("state", &self.state())
            .finish()
    }
}

impl TestClient {
    /// Connect and wait for registration.
    ///
    /// Fails with `ConnectTimeout` if the server does not confirm
    /// registration within `config.connect_timeout`, or with
    /// `ClosedBeforeRegistration` if the transport fails or closes first.
    /// Whichever of registration/close the reader observes first wins.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let inbox = Inbox::new();
        let lifecycle = Arc::new(Lifecycle::new());
        lifecycle.begin_connect();
        info!(host = %config.host, port = config.port, nick = %config.nick, tls = config.tls, "connecting");

        let deadline = Deadline::after(config.connect_timeout);
        // Subscribed before any byte is read so neither signal can be missed
        let outcome = inbox.subscribe(|event| event.is_named("registered") || event.is_named("close"));

        let opened = tokio::time::timeout_at(
            deadline.expires_at(),
            Connection::open(&config, inbox.clone(), lifecycle.clone()),
        )
        .await;

        let connection = match opened {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => {
                lifecycle.mark_closed();
                inbox.close();
                warn!(host = %config.host, port = config.port, error = %e, "connect failed");
                return Err(Error::ClosedBeforeRegistration {
                    host: config.host,
                    port: config.port,
                    reason: Some(e.to_string()),
                });
            }
            Err(_) => {
                lifecycle.mark_closed();
                inbox.close();
                return Err(connect_timeout(&config));
            }
        };

        let client = Self {
            config,
            inbox,
            lifecycle,
            connection,
        };

        match await_first(outcome, deadline).await {
            Ok(Event::Registered { .. }) => Ok(client),
            Ok(Event::Close { reason }) => Err(Error::ClosedBeforeRegistration {
                host: client.config.host.clone(),
                port: client.config.port,
                reason,
            }),
            Ok(_) | Err(WaitFailure::Cancelled) => Err(Error::ClosedBeforeRegistration {
                host: client.config.host.clone(),
                port: client.config.port,
                reason: None,
            }),
            Err(WaitFailure::Elapsed) => {
                client.connection.shutdown();
                Err(connect_timeout(&client.config))
            }
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current nickname as confirmed by the server
    pub fn nick(&self) -> String {
        self.connection.nick()
    }

    pub fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }

    // ==================== Waits ====================

    /// Wait for the next occurrence of a named event (default timeout)
    pub async fn wait_for_event(&self, name: &str) -> Result<Event> {
        self.wait_for_event_timeout(name, self.config.wait_timeout)
            .await
    }

    /// Wait for the next occurrence of a named event
    pub async fn wait_for_event_timeout(&self, name: &str, timeout: Duration) -> Result<Event> {
        wait::wait_for_event(&self.inbox, name, timeout).await
    }

    /// Wait until a server line matching `pattern` has been received
    /// (default timeout). Lines already buffered count.
    pub async fn wait_for_raw(&self, pattern: impl IntoPattern) -> Result<String> {
        self.wait_for_raw_timeout(pattern, self.config.wait_timeout)
            .await
    }

    /// Wait until a server line matching `pattern` has been received
    pub async fn wait_for_raw_timeout(
        &self,
        pattern: impl IntoPattern,
        timeout: Duration,
    ) -> Result<String> {
        wait::wait_for_raw(&self.inbox, pattern, timeout, self.config.history_window).await
    }

    // ==================== Line buffer ====================

    /// Every server line received so far (copy)
    pub fn raw_messages(&self) -> Vec<String> {
        self.inbox.history().into_iter().map(|line| line.text).collect()
    }

    /// Buffered server lines with their arrival index
    pub fn history(&self) -> Vec<Line> {
        self.inbox.history()
    }

    /// Forget buffered lines; pending waits are unaffected
    pub fn clear_raw_buffer(&self) {
        self.inbox.clear_history();
    }

    // ==================== Commands ====================

    /// Send a raw IRC line
    pub fn raw(&self, line: impl Into<String>) {
        self.connection.raw(line);
    }

    pub fn join(&self, channel: &str) {
        self.connection.join(channel);
    }

    /// PRIVMSG to a channel or user
    pub fn say(&self, target: &str, text: &str) {
        self.connection.say(target, text);
    }

    pub fn notice(&self, target: &str, text: &str) {
        self.connection.notice(target, text);
    }

    pub fn change_nick(&self, nick: &str) {
        self.connection.change_nick(nick);
    }

    /// Send QUIT. Safe on a closed client.
    pub fn quit(&self, reason: &str) {
        self.connection.quit(reason);
    }

    /// Quit, give the server a moment to close, then tear the transport
    /// down. Pending waits fail with `Cancelled`. Idempotent.
    pub async fn disconnect(&self, reason: &str) {
        if !self.lifecycle.is_closed() {
            self.quit(reason);
            if !self.lifecycle.wait_closed(QUIT_GRACE).await {
                warn!(nick = %self.nick(), "server did not close after QUIT");
            }
        }
        self.connection.shutdown();
    }
}

/// Create a client and connect it
pub async fn create_test_client(config: ClientConfig) -> Result<TestClient> {
    TestClient::connect(config).await
}

/// `prefix` plus a short random suffix, for nicks and channels that must
/// not collide across parallel tests
pub fn unique_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &id[..6])
}

fn connect_timeout(config: &ClientConfig) -> Error {
    warn!(host = %config.host, port = config.port, "connection timeout");
    Error::ConnectTimeout {
        host: config.host.clone(),
        port: config.port,
    }
}
