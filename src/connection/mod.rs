//! IRC connection
//!
//! Owns the transport for one client: TCP (optionally TLS), line framing,
//! the NICK/USER registration handshake and automatic PONG replies. Every
//! line and state change is published to the client's [`Inbox`]. Outbound
//! lines go through an unbounded queue so the command methods never block.

pub mod event;
pub mod message;

pub use event::{Event, RawLine};
pub use message::Message;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_rustls::rustls::{self, pki_types::ServerName, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::lifecycle::Lifecycle;
use crate::wait::Inbox;

/// A live transport plus its reader and writer tasks
pub struct Connection {
    outbound: mpsc::UnboundedSender<String>,
    nick: Arc<Mutex<String>>,
    inbox: Inbox,
    lifecycle: Arc<Lifecycle>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("nick", &*self.nick.lock())
            .field("state", &self.lifecycle.state())
            .finish()
    }
}

impl Connection {
    /// Open the transport and start registration. Returns once the handshake
    /// lines are queued; registration is reported through the inbox.
    pub async fn open(
        config: &ClientConfig,
        inbox: Inbox,
        lifecycle: Arc<Lifecycle>,
    ) -> Result<Self> {
        let tcp = TcpStream::connect((config.host.as_str(), config.port)).await?;
        tcp.set_nodelay(true)?;

        if config.tls {
            let server_name = ServerName::try_from(config.host.clone())
                .map_err(|_| Error::InvalidServerName(config.host.clone()))?;
            let tls = tls_connector().connect(server_name, tcp).await?;
            debug!(host = %config.host, "TLS handshake complete");
            Ok(Self::start(tls, config, inbox, lifecycle))
        } else {
            Ok(Self::start(tcp, config, inbox, lifecycle))
        }
    }

    fn start<S>(stream: S, config: &ClientConfig, inbox: Inbox, lifecycle: Arc<Lifecycle>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (outbound, rx) = mpsc::unbounded_channel();
        let nick = Arc::new(Mutex::new(config.nick.clone()));

        // Queued before the writer starts, so they are the first lines out
        let _ = outbound.send(format!("NICK {}", config.nick));
        let _ = outbound.send(format!(
            "USER {} 0 * :{}",
            config.username(),
            config.display_name()
        ));

        let writer = tokio::spawn(write_loop(write_half, rx, inbox.clone(), nick.clone()));
        let reader = tokio::spawn(read_loop(
            read_half,
            outbound.clone(),
            inbox.clone(),
            lifecycle.clone(),
            nick.clone(),
        ));

        Self {
            outbound,
            nick,
            inbox,
            lifecycle,
            reader,
            writer,
        }
    }

    /// Current nickname as confirmed by the server
    pub fn nick(&self) -> String {
        self.nick.lock().clone()
    }

    /// Queue a raw line. Silently dropped once the connection is gone.
    pub fn raw(&self, line: impl Into<String>) {
        if self.outbound.send(line.into()).is_err() {
            debug!(nick = %self.nick(), "connection closed, outbound line dropped");
        }
    }

    pub fn join(&self, channel: &str) {
        self.raw(format!("JOIN {}", channel));
    }

    pub fn say(&self, target: &str, text: &str) {
        self.raw(format!("PRIVMSG {} :{}", target, single_line(text)));
    }

    pub fn notice(&self, target: &str, text: &str) {
        self.raw(format!("NOTICE {} :{}", target, single_line(text)));
    }

    pub fn change_nick(&self, nick: &str) {
        self.raw(format!("NICK {}", nick));
    }

    pub fn quit(&self, reason: &str) {
        if reason.is_empty() {
            self.raw("QUIT");
        } else {
            self.raw(format!("QUIT :{}", single_line(reason)));
        }
    }

    /// Stop both tasks, mark the connection closed and cancel pending waits
    pub fn shutdown(&self) {
        self.reader.abort();
        self.writer.abort();
        finish(&self.inbox, &self.lifecycle, Some("shut down by client".to_string()));
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

fn tls_connector() -> TlsConnector {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Transition to Closed, announce it once, and cancel every pending wait
fn finish(inbox: &Inbox, lifecycle: &Lifecycle, reason: Option<String>) {
    if let Some(previous) = lifecycle.mark_closed() {
        info!(?previous, reason = reason.as_deref().unwrap_or("eof"), "connection closed");
    }
    inbox.publish(Event::Close { reason });
    inbox.close();
}

async fn read_loop<R>(
    reader: R,
    outbound: mpsc::UnboundedSender<String>,
    inbox: Inbox,
    lifecycle: Arc<Lifecycle>,
    nick: Arc<Mutex<String>>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(512);

    let reason = loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break None,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim_end_matches(['\r', '\n']);
                if !line.is_empty() {
                    handle_line(line, &outbound, &inbox, &lifecycle, &nick);
                }
            }
            Err(e) => break Some(e.to_string()),
        }
    };

    finish(&inbox, &lifecycle, reason);
}

fn handle_line(
    line: &str,
    outbound: &mpsc::UnboundedSender<String>,
    inbox: &Inbox,
    lifecycle: &Lifecycle,
    nick: &Mutex<String>,
) {
    debug!(nick = %nick.lock().as_str(), "<< {}", line);
    let message = Message::parse(line);

    inbox.publish(Event::Raw(RawLine {
        from_server: true,
        line: line.to_string(),
        tags: message.as_ref().map(|m| m.tags.clone()).unwrap_or_default(),
    }));

    let Some(message) = message else {
        return;
    };

    let mut registered = None;
    match message.command.as_str() {
        "PING" => {
            let token = message.trailing().unwrap_or_default();
            let _ = outbound.send(format!("PONG :{}", token));
        }
        "001" => {
            if let Some(confirmed) = message.params.first() {
                *nick.lock() = confirmed.clone();
            }
            if lifecycle.mark_registered() {
                let confirmed = nick.lock().clone();
                info!(nick = %confirmed, "registered");
                registered = Some(confirmed);
            }
        }
        "NICK" => {
            let mut current = nick.lock();
            if message.source_nick() == Some(current.as_str()) {
                if let Some(new_nick) = message.trailing() {
                    debug!(from = %current.as_str(), to = %new_nick, "nick changed");
                    *current = new_nick.to_string();
                }
            }
        }
        _ => {}
    }

    inbox.publish(Event::Message(message));
    if let Some(nick) = registered {
        inbox.publish(Event::Registered { nick });
    }
}

async fn write_loop<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<String>,
    inbox: Inbox,
    nick: Arc<Mutex<String>>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        debug!(nick = %nick.lock().as_str(), ">> {}", line);
        let mut bytes = Vec::with_capacity(line.len() + 2);
        bytes.extend_from_slice(line.as_bytes());
        bytes.extend_from_slice(b"\r\n");

        inbox.publish(Event::Raw(RawLine {
            from_server: false,
            line,
            tags: Default::default(),
        }));

        if let Err(e) = writer.write_all(&bytes).await {
            debug!(error = %e, "write failed");
            break;
        }
    }
    let _ = writer.shutdown().await;
}
