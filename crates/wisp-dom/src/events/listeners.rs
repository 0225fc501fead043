//! Event listener storage
//!
//! Each node keeps its explicitly attached listeners in registration order.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::EventCallback;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// One `addEventListener` registration
#[derive(Clone)]
pub struct Listener {
    pub id: ListenerId,
    pub event_type: String,
    pub callback: EventCallback,
    pub capture: bool,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .field("capture", &self.capture)
            .finish()
    }
}

/// Per-node listener list
#[derive(Default, Clone)]
pub struct EventListeners {
    entries: Vec<Listener>,
}

impl EventListeners {
    /// Register a listener. Duplicates are kept.
    pub fn add(&mut self, event_type: &str, callback: EventCallback, capture: bool) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::SeqCst));
        self.entries.push(Listener {
            id,
            event_type: event_type.to_string(),
            callback,
            capture,
        });
        id
    }

    /// Remove the first registration with the same type, callback and capture flag
    pub fn remove(&mut self, event_type: &str, callback: &EventCallback, capture: bool) -> bool {
        let pos = self.entries.iter().position(|l| {
            l.event_type == event_type && l.capture == capture && Arc::ptr_eq(&l.callback, callback)
        });
        match pos {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn remove_by_id(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|l| l.id != id);
        self.entries.len() != before
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries.iter().any(|l| l.id == id)
    }

    /// Snapshot of the listeners for one type and capture flag
    pub fn matching(&self, event_type: &str, capture: bool) -> Vec<Listener> {
        self.entries
            .iter()
            .filter(|l| l.event_type == event_type && l.capture == capture)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
