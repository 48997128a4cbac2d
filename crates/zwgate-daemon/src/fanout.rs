//! Fanout of log lines and events to connected observers
//!
//! Console sessions and event-stream subscribers register a channel sender
//! and drain the matching receiver from their own task. Broadcasting never
//! awaits: each delivery is a `try_send`, a full channel drops that line for
//! that observer only, and a closed channel is deregistered while the
//! broadcast continues with the rest.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Lines buffered per observer before new lines are dropped for it
pub const CHANNEL_CAPACITY: usize = 256;

pub type ChannelTx = mpsc::Sender<String>;
pub type ChannelRx = mpsc::Receiver<String>;

/// Handle identifying a registered channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(Uuid);

impl ChannelId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Default)]
struct ChannelSet {
    channels: HashMap<ChannelId, ChannelTx>,
}

impl ChannelSet {
    fn deliver(&mut self, kind: &str, text: &str) -> usize {
        let mut delivered = 0;
        self.channels.retain(|id, tx| match tx.try_send(text.to_string()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!(channel = %id, kind, "Observer lagging, dropped line");
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(channel = %id, kind, "Observer gone, deregistering");
                false
            }
        });
        delivered
    }
}

/// Registry of live observer channels
#[derive(Default)]
pub struct Fanout {
    consoles: Mutex<ChannelSet>,
    streams: Mutex<ChannelSet>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bounded channel for a new observer
    pub fn channel() -> (ChannelTx, ChannelRx) {
        mpsc::channel(CHANNEL_CAPACITY)
    }

    pub fn register_console(&self, tx: ChannelTx) -> ChannelId {
        let id = ChannelId::new();
        self.consoles.lock().channels.insert(id, tx);
        id
    }

    pub fn unregister_console(&self, id: ChannelId) -> bool {
        self.consoles.lock().channels.remove(&id).is_some()
    }

    pub fn register_events(&self, tx: ChannelTx) -> ChannelId {
        let id = ChannelId::new();
        self.streams.lock().channels.insert(id, tx);
        id
    }

    pub fn unregister_events(&self, id: ChannelId) -> bool {
        self.streams.lock().channels.remove(&id).is_some()
    }

    /// Log a line and mirror it to every console session.
    /// Returns the number of sessions it reached.
    pub fn broadcast_log(&self, text: &str) -> usize {
        info!(target: "zwgate::network", "{}", text);
        self.consoles.lock().deliver("console", text)
    }

    /// Like [`Fanout::broadcast_log`] at error level
    pub fn broadcast_error(&self, text: &str) -> usize {
        error!(target: "zwgate::network", "{}", text);
        self.consoles.lock().deliver("console", text)
    }

    /// Send an event line to every event-stream subscriber
    pub fn broadcast_event(&self, text: &str) -> usize {
        self.streams.lock().deliver("events", text)
    }

    pub fn console_count(&self) -> usize {
        self.consoles.lock().channels.len()
    }

    pub fn event_count(&self) -> usize {
        self.streams.lock().channels.len()
    }
}
