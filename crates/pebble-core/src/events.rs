//! View notifications.
//!
//! The tree model publishes `TreeEvent`s on an `EventBus`; a host view
//! subscribes and re-renders. Subscriptions unsubscribe when dropped.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::node::NodeId;

/// Structural or state change the view should reflect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TreeEvent {
    /// A node was inserted under `parent`.
    NodeAdded { id: NodeId, parent: NodeId },
    /// A node and its subtree were detached.
    NodeRemoved { id: NodeId },
    /// Flags (loading, expanded, loaded) or the record of a node changed.
    NodeChanged { id: NodeId },
    /// The selection was replaced.
    SelectionChanged { ids: Vec<NodeId> },
    /// Generic repaint request.
    Refresh,
    /// A resource should be opened by the host viewer/editor.
    OpenResource { uri: String },
    /// An editor was closed; pending edits were discarded.
    EditorClosed { uri: String },
}

/// Keeps a view listener registered. Dropping it removes the listener.
pub struct Subscription {
    bus: Weak<EventBus>,
    id: usize,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.id);
        }
    }
}

type Listener = Arc<dyn Fn(TreeEvent) + Send + Sync>;

/// Fan-out point between the tree model and its views.
///
/// Shared as `Arc<EventBus>` by the model and every listener handle.
pub struct EventBus {
    listeners: RwLock<BTreeMap<usize, Listener>>,
    next_id: AtomicUsize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self {
            listeners: RwLock::new(BTreeMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a view listener. Listeners run in registration order.
    pub fn subscribe(
        self: &Arc<Self>,
        listener: impl Fn(TreeEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::new(listener));
        Subscription {
            bus: Arc::downgrade(self),
            id,
        }
    }

    fn unsubscribe(&self, id: usize) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Deliver `event` to every registered view.
    pub fn emit(&self, event: TreeEvent) {
        // Listeners run without the lock held, so they may subscribe or drop handles.
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();

        for listener in listeners {
            listener(event.clone());
        }
    }
}
