// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Typed mutation events and the observer registry
//!
//! Observers are registered explicitly and receive a shared reference to
//! each event after the mutation has been applied.

use std::fmt;

/// Which attribute operation triggered an update event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeUpdate {
    Set,
    Remove,
    Replace,
    Merge,
    Update,
}

/// Events emitted by the graph store
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    NodeAdded {
        key: String,
    },
    EdgeAdded {
        key: String,
        source: String,
        target: String,
        undirected: bool,
    },
    NodeDropped {
        key: String,
    },
    EdgeDropped {
        key: String,
        source: String,
        target: String,
        undirected: bool,
    },
    NodeAttributesUpdated {
        key: String,
        kind: AttributeUpdate,
        name: Option<String>,
    },
    EdgeAttributesUpdated {
        key: String,
        kind: AttributeUpdate,
        name: Option<String>,
    },
    GraphAttributesUpdated {
        kind: AttributeUpdate,
        name: Option<String>,
    },
    EdgesCleared,
    Cleared,
}

/// Capability returned by `Graph::subscribe`, needed to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Listener = Box<dyn FnMut(&GraphEvent)>;

/// Registry of event listeners
#[derive(Default)]
pub(crate) struct Observers {
    listeners: Vec<(Subscription, Listener)>,
    next_id: u64,
}

impl Observers {
    pub fn subscribe(&mut self, listener: Listener) -> Subscription {
        let subscription = Subscription(self.next_id);
        self.next_id += 1;
        self.listeners.push((subscription, listener));
        subscription
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(id, _)| *id != subscription);
        self.listeners.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Notify listeners. The event is only built when someone listens.
    pub fn emit_with<F>(&mut self, build: F)
    where
        F: FnOnce() -> GraphEvent,
    {
        if self.listeners.is_empty() {
            return;
        }

        let event = build();
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_subscribe_emit_unsubscribe() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut observers = Observers::default();

        let sink = Rc::clone(&seen);
        let subscription = observers.subscribe(Box::new(move |event| {
            sink.borrow_mut().push(event.clone());
        }));

        observers.emit_with(|| GraphEvent::Cleared);
        assert_eq!(seen.borrow().len(), 1);

        assert!(observers.unsubscribe(subscription));
        assert!(!observers.unsubscribe(subscription));

        observers.emit_with(|| GraphEvent::EdgesCleared);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_emit_without_listeners_skips_build() {
        let mut observers = Observers::default();
        observers.emit_with(|| panic!("event should not be built"));
    }
}
