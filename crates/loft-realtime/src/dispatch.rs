//! Typed event dispatch with per-listener failure isolation.
//!
//! Callers register listeners per event category with [`EventDispatcher::on`]
//! and remove them with [`EventDispatcher::off`]. Emission is crate-internal:
//! only the router and connection actor produce events. A listener that
//! panics is caught and logged; the remaining listeners for the category
//! still run, and nothing propagates back into frame handling.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use serde_json::Value;
use tracing::warn;

use crate::types::ConnectionStatus;

/// Event categories. A closed set: adding a server message type means
/// adding a variant here and a router case, nothing else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Connection lifecycle transitions.
    ConnectionStatus,
    /// A new message arrived in a subscribed conversation.
    NewMessage,
    /// A thread's metadata changed.
    ThreadUpdated,
    /// A presence change for some principal.
    PresenceUpdate,
}

/// A dispatched event, one payload shape per category.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    /// Connection status changed.
    ConnectionStatus(ConnectionStatus),
    /// New message payload, as delivered by the server.
    NewMessage(Value),
    /// Updated thread payload.
    ThreadUpdated(Value),
    /// Presence payload.
    PresenceUpdate(Value),
}

impl ClientEvent {
    /// The category this event dispatches under.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ConnectionStatus(_) => EventKind::ConnectionStatus,
            Self::NewMessage(_) => EventKind::NewMessage,
            Self::ThreadUpdated(_) => EventKind::ThreadUpdated,
            Self::PresenceUpdate(_) => EventKind::PresenceUpdate,
        }
    }
}

/// Handle returned by [`EventDispatcher::on`], used to remove the listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = dyn Fn(&ClientEvent) + Send + Sync;

/// Listener registry keyed by event category.
///
/// The registry lives for the whole client instance; it is not tied to any
/// one connection.
pub struct EventDispatcher {
    listeners: scc::HashMap<EventKind, Vec<(ListenerId, Arc<Listener>)>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self {
            listeners: scc::HashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener for an event category.
    pub fn on(
        &self,
        kind: EventKind,
        listener: impl Fn(&ClientEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: Arc<Listener> = Arc::new(listener);
        let mut pending = Some((id, listener));

        loop {
            let _ = self.listeners.update_sync(&kind, |_, list| {
                if let Some(entry) = pending.take() {
                    list.push(entry);
                }
            });
            let Some(entry) = pending.take() else {
                return id;
            };

            match self.listeners.insert_sync(kind, vec![entry]) {
                Ok(()) => return id,
                // Race: another thread created the entry first; push into it.
                Err((_, mut list)) => pending = list.pop(),
            }
        }
    }

    /// Remove a previously registered listener.
    ///
    /// Returns `false` if the id was not registered under this category.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.listeners
            .update_sync(&kind, |_, list| {
                let before = list.len();
                list.retain(|(listener_id, _)| *listener_id != id);
                before != list.len()
            })
            .unwrap_or(false)
    }

    /// Number of listeners registered for a category.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .read_sync(&kind, |_, list| list.len())
            .unwrap_or(0)
    }

    /// Invoke every listener registered for the event's category.
    ///
    /// Emitting to a category with no listeners is a no-op. Each listener
    /// runs isolated: a panic is caught and logged without affecting the
    /// other listeners or the caller.
    pub(crate) fn emit(&self, event: &ClientEvent) {
        let kind = event.kind();
        let Some(snapshot) = self.listeners.read_sync(&kind, |_, list| list.clone()) else {
            return;
        };

        for (id, listener) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                warn!(listener = id.0, ?kind, "event listener panicked; continuing");
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_emit_delivers_payload() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        dispatcher.on(EventKind::NewMessage, move |event| {
            sink.lock().unwrap().push(event.clone());
        });

        dispatcher.emit(&ClientEvent::NewMessage(json!({"id": 7})));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), [ClientEvent::NewMessage(json!({"id": 7}))]);
    }

    #[test]
    fn test_emit_without_listeners_is_noop() {
        let dispatcher = EventDispatcher::new();
        dispatcher.emit(&ClientEvent::PresenceUpdate(json!({})));
    }

    #[test]
    fn test_listeners_are_scoped_to_their_category() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicU64::new(0));

        let sink = Arc::clone(&count);
        dispatcher.on(EventKind::ThreadUpdated, move |_| {
            sink.fetch_add(1, Ordering::Relaxed);
        });

        dispatcher.emit(&ClientEvent::NewMessage(json!({})));
        assert_eq!(count.load(Ordering::Relaxed), 0);

        dispatcher.emit(&ClientEvent::ThreadUpdated(json!({})));
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_off_removes_listener() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicU64::new(0));

        let sink = Arc::clone(&count);
        let id = dispatcher.on(EventKind::NewMessage, move |_| {
            sink.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(dispatcher.listener_count(EventKind::NewMessage), 1);

        assert!(dispatcher.off(EventKind::NewMessage, id));
        dispatcher.emit(&ClientEvent::NewMessage(json!({})));
        assert_eq!(count.load(Ordering::Relaxed), 0);

        // Already removed.
        assert!(!dispatcher.off(EventKind::NewMessage, id));
        // Wrong category.
        assert!(!dispatcher.off(EventKind::PresenceUpdate, id));
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicU64::new(0));

        dispatcher.on(EventKind::NewMessage, |_| panic!("listener bug"));
        let sink = Arc::clone(&count);
        dispatcher.on(EventKind::NewMessage, move |_| {
            sink.fetch_add(1, Ordering::Relaxed);
        });

        dispatcher.emit(&ClientEvent::NewMessage(json!({"id": 1})));
        assert_eq!(count.load(Ordering::Relaxed), 1);

        // And the dispatcher keeps working for subsequent emits.
        dispatcher.emit(&ClientEvent::NewMessage(json!({"id": 2})));
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_multiple_listeners_all_invoked() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicU64::new(0));

        for _ in 0..3 {
            let sink = Arc::clone(&count);
            dispatcher.on(EventKind::PresenceUpdate, move |_| {
                sink.fetch_add(1, Ordering::Relaxed);
            });
        }

        dispatcher.emit(&ClientEvent::PresenceUpdate(json!({})));
        assert_eq!(count.load(Ordering::Relaxed), 3);
    }
}
