//! Wait engine
//!
//! Both wait operations, and `connect`, are built on one primitive:
//! [`await_first`] races a [`Subscription`] against a [`Deadline`]. Whichever
//! side finishes first decides the outcome; the other side is dropped, which
//! deregisters the listener or discards the timer.
//!
//! `wait_for_raw` additionally scans the line history before subscribing, so
//! a line that arrived between sending a command and starting the wait still
//! counts.

mod deadline;
mod inbox;

pub use deadline::Deadline;
pub use inbox::{Inbox, Subscription};

use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use crate::connection::Event;
use crate::error::{Error, Result};

/// Why a race ended without a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitFailure {
    /// The deadline passed first
    Elapsed,
    /// The listener was dropped by its inbox (connection closed)
    Cancelled,
}

/// Settle `subscription` with its first event or fail when `deadline` passes.
/// Settles exactly once; the listener is gone by the time this returns.
pub async fn await_first(
    mut subscription: Subscription,
    deadline: Deadline,
) -> std::result::Result<Event, WaitFailure> {
    tokio::select! {
        biased;
        received = &mut subscription.rx => received.map_err(|_| WaitFailure::Cancelled),
        _ = deadline.expired() => Err(WaitFailure::Elapsed),
    }
}

/// Anything usable as a raw-line pattern
pub trait IntoPattern {
    fn into_regex(self) -> Result<Regex>;
}

impl IntoPattern for Regex {
    fn into_regex(self) -> Result<Regex> {
        Ok(self)
    }
}

impl IntoPattern for &Regex {
    fn into_regex(self) -> Result<Regex> {
        Ok(self.clone())
    }
}

impl IntoPattern for &str {
    fn into_regex(self) -> Result<Regex> {
        Ok(Regex::new(self)?)
    }
}

impl IntoPattern for String {
    fn into_regex(self) -> Result<Regex> {
        Ok(Regex::new(&self)?)
    }
}

impl IntoPattern for &String {
    fn into_regex(self) -> Result<Regex> {
        Ok(Regex::new(self)?)
    }
}

/// Wait for the next event called `name` (no history)
pub async fn wait_for_event(inbox: &Inbox, name: &str, timeout: Duration) -> Result<Event> {
    let wanted = name.to_string();
    let subscription = inbox.subscribe(move |event| event.is_named(&wanted));

    match await_first(subscription, Deadline::after(timeout)).await {
        Ok(event) => Ok(event),
        Err(WaitFailure::Elapsed) => {
            warn!(event = name, ?timeout, "timeout waiting for event");
            Err(Error::EventTimeout {
                event: name.to_string(),
                timeout,
            })
        }
        Err(WaitFailure::Cancelled) => Err(Error::Cancelled {
            what: format!("event {}", name),
        }),
    }
}

/// Wait for the first server line, buffered or future, matching `pattern`.
/// On timeout the error carries the last `window` buffered lines.
pub async fn wait_for_raw(
    inbox: &Inbox,
    pattern: impl IntoPattern,
    timeout: Duration,
    window: usize,
) -> Result<String> {
    let regex = pattern.into_regex()?;
    let pattern_text = regex.as_str().to_string();
    let deadline = Deadline::after(timeout);

    let matcher = regex.clone();
    let subscription = match inbox.scan_or_subscribe(move |line| matcher.is_match(line)) {
        Ok(line) => {
            debug!(pattern = %pattern_text, %line, "matched from history");
            return Ok(line);
        }
        Err(subscription) => subscription,
    };

    match await_first(subscription, deadline).await.map(Event::into_server_line) {
        Ok(Some(line)) => {
            debug!(pattern = %pattern_text, %line, "matched live line");
            Ok(line)
        }
        Err(WaitFailure::Elapsed) => {
            warn!(pattern = %pattern_text, ?timeout, "timeout waiting for raw pattern");
            Err(Error::RawTimeout {
                pattern: pattern_text,
                timeout,
                recent: inbox.recent(window),
            })
        }
        Ok(None) | Err(WaitFailure::Cancelled) => Err(Error::Cancelled {
            what: format!("raw pattern {}", pattern_text),
        }),
    }
}
