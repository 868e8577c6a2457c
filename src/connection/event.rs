//! Events emitted by a connection

use std::collections::BTreeMap;

use serde::Serialize;

use super::message::Message;

/// A raw protocol line, inbound or outbound
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawLine {
    pub from_server: bool,
    pub line: String,
    pub tags: BTreeMap<String, String>,
}

/// Something a connection reports to its listeners
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Event {
    /// Server accepted the registration handshake (numeric 001)
    Registered { nick: String },
    /// Transport shut down
    Close { reason: Option<String> },
    /// Every line seen on the wire
    Raw(RawLine),
    /// A parsed inbound message, named after its command
    Message(Message),
}

impl Event {
    /// Event name used by `wait_for_event`: `registered`, `close`, `raw`,
    /// or the lowercased command (`privmsg`, `join`, `001`, ...)
    pub fn name(&self) -> String {
        match self {
            Event::Registered { .. } => "registered".to_string(),
            Event::Close { .. } => "close".to_string(),
            Event::Raw(_) => "raw".to_string(),
            Event::Message(msg) => msg.command.to_ascii_lowercase(),
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
    }

    /// Text of an inbound raw line
    pub fn server_line(&self) -> Option<&str> {
        match self {
            Event::Raw(raw) if raw.from_server => Some(&raw.line),
            _ => None,
        }
    }

    /// Owned form of [`Event::server_line`]
    pub fn into_server_line(self) -> Option<String> {
        match self {
            Event::Raw(raw) if raw.from_server => Some(raw.line),
            _ => None,
        }
    }
}
