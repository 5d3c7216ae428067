//! Lifecycle event fan-out.
//!
//! Handlers are invoked synchronously, in registration order. No queuing,
//! no retry.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};

use aegis_common::{EventKind, EventRecord, TokenEvent};

/// Callback registered for a single event kind
pub type EventHandler = Box<dyn Fn(&TokenEvent) + Send + Sync>;

/// Synchronous event fan-out
#[derive(Default)]
pub struct EventEmitter {
    handlers: RwLock<Vec<(EventKind, EventHandler)>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind
    pub fn on(&self, kind: EventKind, handler: EventHandler) {
        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((kind, handler));
    }

    /// Invoke every handler registered for this event's kind, in
    /// registration order
    pub fn emit(&self, event: &TokenEvent) {
        let kind = event.kind();
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (registered, handler) in handlers.iter() {
            if *registered == kind {
                handler(event);
            }
        }
    }

}

/// Bounded in-memory history of emitted events
pub struct EventLog {
    entries: Mutex<VecDeque<EventRecord>>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append an event, evicting the oldest entry when full
    pub fn record(&self, event: &TokenEvent) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(EventRecord::from_event(event));
    }

    /// Snapshot of retained events, oldest first
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Wire an event log into an emitter for both event kinds
pub fn register_event_log(emitter: &EventEmitter, log: Arc<EventLog>) {
    let sink = log.clone();
    emitter.on(EventKind::Generated, Box::new(move |event| sink.record(event)));
    emitter.on(EventKind::Failed, Box::new(move |event| log.record(event)));
}
