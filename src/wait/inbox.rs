//! Inbound event hub
//!
//! Holds the line buffer and the listener list under one lock. That makes
//! "scan history, then subscribe" atomic with respect to new lines: a line is
//! either already in the buffer when a wait scans it, or it is dispatched to
//! the listener the wait registered. It cannot fall between the two.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::buffer::{Line, LineBuffer};
use crate::connection::Event;

type Filter = Box<dyn Fn(&Event) -> bool + Send>;

struct Listener {
    id: u64,
    filter: Filter,
    tx: oneshot::Sender<Event>,
}

#[derive(Default)]
struct State {
    lines: LineBuffer,
    listeners: Vec<Listener>,
    next_id: u64,
    closed: bool,
}

/// Per-connection event hub; cheap to clone
#[derive(Clone, Default)]
pub struct Inbox {
    state: Arc<Mutex<State>>,
}

impl std::fmt::Debug for Inbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Inbox")
            .field("lines", &state.lines.len())
            .field("listeners", &state.listeners.len())
            .field("closed", &state.closed)
            .finish()
    }
}

/// Handle for one registered listener. Dropping it deregisters exactly that
/// listener and nothing else.
pub struct Subscription {
    id: u64,
    pub(super) rx: oneshot::Receiver<Event>,
    inbox: Weak<Mutex<State>>,
}

impl Subscription {
    /// Deregister now (same as dropping)
    pub fn cancel(self) {}

    fn detached(id: u64) -> Self {
        // Sender dropped immediately: the receiver reports cancellation
        let (_tx, rx) = oneshot::channel();
        Self {
            id,
            rx,
            inbox: Weak::new(),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.inbox.upgrade() {
            let id = self.id;
            state.lock().listeners.retain(|l| l.id != id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event: server lines are appended to history, then every
    /// listener whose filter accepts the event is settled and removed.
    pub fn publish(&self, event: Event) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        if let Some(line) = event.server_line() {
            state.lines.append(line);
        }

        let listeners = std::mem::take(&mut state.listeners);
        for listener in listeners {
            if listener.tx.is_closed() {
                continue;
            }
            if (listener.filter)(&event) {
                debug!(listener = listener.id, event = %event.name(), "wait settled");
                let _ = listener.tx.send(event.clone());
            } else {
                state.listeners.push(listener);
            }
        }
    }

    /// Listen for the first future event accepted by `filter`
    pub fn subscribe<F>(&self, filter: F) -> Subscription
    where
        F: Fn(&Event) -> bool + Send + 'static,
    {
        let mut state = self.state.lock();
        self.register(&mut state, Box::new(filter))
    }

    /// Return the first buffered server line accepted by `matcher`, or, if
    /// none is, a subscription for the first future one.
    pub fn scan_or_subscribe<F>(&self, matcher: F) -> Result<String, Subscription>
    where
        F: Fn(&str) -> bool + Send + 'static,
    {
        let mut state = self.state.lock();
        if let Some(line) = state.lines.find(|text| matcher(text)) {
            return Ok(line.text.clone());
        }
        Err(self.register(
            &mut state,
            Box::new(move |event: &Event| event.server_line().is_some_and(|line| matcher(line))),
        ))
    }

    fn register(&self, state: &mut State, filter: Filter) -> Subscription {
        let id = state.next_id;
        state.next_id += 1;
        if state.closed {
            return Subscription::detached(id);
        }

        let (tx, rx) = oneshot::channel();
        state.listeners.push(Listener { id, filter, tx });
        Subscription {
            id,
            rx,
            inbox: Arc::downgrade(&self.state),
        }
    }

    /// Stop accepting events and cancel every pending listener
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        let cancelled = state.listeners.len();
        state.listeners.clear();
        if cancelled > 0 {
            debug!(cancelled, "pending waits cancelled");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Copy of the buffered server lines
    pub fn history(&self) -> Vec<Line> {
        self.state.lock().lines.snapshot()
    }

    /// Last `n` buffered lines, for diagnostics
    pub fn recent(&self, n: usize) -> Vec<String> {
        self.state.lock().lines.tail(n)
    }

    pub fn clear_history(&self) {
        self.state.lock().lines.clear();
    }

    /// Number of live listeners
    pub fn pending(&self) -> usize {
        self.state.lock().listeners.len()
    }
}
