//! Mutation events and their broadcaster.
//!
//! After a successful write the handler layer creates one [`MutationEvent`]
//! and hands it to the [`Broadcaster`]. Dispatch is synchronous and in
//! registration order on the calling task; handlers that need background work
//! queue it themselves. The registry is keyed by [`EventKind`] only, so
//! handlers interested in a single table filter on
//! [`MutationEvent::table`] themselves.

use quarry_core::Row;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, RwLock};

/// What a mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

/// One successful mutation.
///
/// Handed to handlers by reference during dispatch; a handler that needs the
/// event afterwards must clone it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationEvent {
    pub kind: EventKind,
    pub table: String,
    pub row: Row,
}

impl MutationEvent {
    pub fn new(kind: EventKind, table: impl Into<String>, row: Row) -> Self {
        Self {
            kind,
            table: table.into(),
            row,
        }
    }
}

type Handler = Arc<dyn Fn(&MutationEvent) + Send + Sync>;

/// Registry of mutation handlers.
///
/// A panicking handler is logged and skipped; the handlers after it still
/// run, and the panic never reaches the mutation that broadcast the event.
#[derive(Default)]
pub struct Broadcaster {
    handlers: RwLock<HashMap<EventKind, Vec<Handler>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    pub fn listen<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&MutationEvent) + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        handlers.entry(kind).or_default().push(Arc::new(handler));
    }

    /// Dispatch an event to every handler of its kind, in registration order.
    pub fn broadcast(&self, event: MutationEvent) {
        let snapshot: Vec<Handler> = {
            let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
            match handlers.get(&event.kind) {
                Some(list) => list.clone(),
                None => return,
            }
        };
        for handler in snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                tracing::error!(
                    kind = ?event.kind,
                    table = %event.table,
                    "mutation handler panicked"
                );
            }
        }
    }

    /// Number of handlers registered for a kind.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        handlers.get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::Value;
    use std::sync::Mutex;

    fn event(kind: EventKind, table: &str) -> MutationEvent {
        MutationEvent::new(kind, table, Row::from_pairs([("id", Value::Int(1))]))
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let broadcaster = Broadcaster::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            broadcaster.listen(EventKind::Created, move |_| {
                seen.lock().unwrap().push(label);
            });
        }
        broadcaster.broadcast(event(EventKind::Created, "posts"));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn dispatch_is_kind_scoped() {
        let broadcaster = Broadcaster::new();
        let created = Arc::new(Mutex::new(0u32));
        {
            let created = Arc::clone(&created);
            broadcaster.listen(EventKind::Created, move |_| {
                *created.lock().unwrap() += 1;
            });
        }
        broadcaster.broadcast(event(EventKind::Deleted, "posts"));
        assert_eq!(*created.lock().unwrap(), 0);
        broadcaster.broadcast(event(EventKind::Created, "posts"));
        assert_eq!(*created.lock().unwrap(), 1);
    }

    #[test]
    fn handlers_self_filter_on_table() {
        let broadcaster = Broadcaster::new();
        let posts_events = Arc::new(Mutex::new(0u32));
        {
            let posts_events = Arc::clone(&posts_events);
            broadcaster.listen(EventKind::Updated, move |event| {
                if event.table == "posts" {
                    *posts_events.lock().unwrap() += 1;
                }
            });
        }
        broadcaster.broadcast(event(EventKind::Updated, "authors"));
        broadcaster.broadcast(event(EventKind::Updated, "posts"));
        assert_eq!(*posts_events.lock().unwrap(), 1);
    }

    #[test]
    fn panicking_handler_does_not_stop_dispatch() {
        let broadcaster = Broadcaster::new();
        let ran = Arc::new(Mutex::new(false));
        broadcaster.listen(EventKind::Created, |_| panic!("boom"));
        {
            let ran = Arc::clone(&ran);
            broadcaster.listen(EventKind::Created, move |_| {
                *ran.lock().unwrap() = true;
            });
        }
        broadcaster.broadcast(event(EventKind::Created, "posts"));
        assert!(*ran.lock().unwrap());
    }

    #[test]
    fn broadcast_without_handlers_is_a_no_op() {
        let broadcaster = Broadcaster::new();
        broadcaster.broadcast(event(EventKind::Deleted, "posts"));
        assert_eq!(broadcaster.handler_count(EventKind::Deleted), 0);
    }
}
