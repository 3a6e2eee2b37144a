//! The engine: a tree model bound to a remote store.
//!
//! `Browser` owns the [`TreeModel`], the store adapter, open editor sessions
//! and the clipboard. Operations live in `factory`, `loader`, `mutation` and
//! `clipboard`; this module holds the shared state and error type.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::clipboard::Clipboard;
use crate::config::BrowserSettings;
use crate::editor::EditorSession;
use crate::events::{EventBus, TreeEvent};
use crate::item::Connection;
use crate::node::{Node, NodeId};
use crate::store::{RemoteStore, StoreError};
use crate::tree::{TreeError, TreeModel};

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    /// The caller broke an invariant of the tree.
    #[error("Invalid operation: {0}")]
    Logic(String),

    #[error("Invalid name: {0}")]
    Validation(String),

    #[error("Server declined {operation} of {uri}")]
    Rejected { operation: &'static str, uri: String },

    #[error("Node is loading: {0}")]
    Busy(String),
}

impl BrowserError {
    /// Programming errors, as opposed to remote or user-input failures.
    pub fn is_logic(&self) -> bool {
        matches!(self, BrowserError::Logic(_) | BrowserError::Tree(_))
    }

    pub(crate) fn logic(message: impl Into<String>) -> Self {
        BrowserError::Logic(message.into())
    }
}

pub type Result<T> = std::result::Result<T, BrowserError>;

pub struct Browser<S: RemoteStore> {
    pub(crate) tree: TreeModel,
    pub(crate) store: S,
    pub(crate) settings: BrowserSettings,
    pub(crate) clipboard: Clipboard,
    pub(crate) editors: HashMap<NodeId, EditorSession>,
}

impl<S: RemoteStore> Browser<S> {
    pub fn new(store: S) -> Self {
        Self::with_settings(store, BrowserSettings::default())
    }

    pub fn with_settings(store: S, settings: BrowserSettings) -> Self {
        Self {
            tree: TreeModel::new(),
            store,
            settings,
            clipboard: Clipboard::default(),
            editors: HashMap::new(),
        }
    }

    pub fn tree(&self) -> &TreeModel {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut TreeModel {
        &mut self.tree
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }

    pub fn events(&self) -> &Arc<EventBus> {
        self.tree.events()
    }

    pub fn node(&self, id: &str) -> Result<&Node> {
        Ok(self.tree.node(id)?)
    }

    pub fn select(&mut self, id: &str) -> Result<()> {
        Ok(self.tree.select(id)?)
    }

    pub fn add_to_selection(&mut self, id: &str) -> Result<()> {
        Ok(self.tree.add_to_selection(id)?)
    }

    pub fn selection(&self) -> &[NodeId] {
        self.tree.selection()
    }

    /// Scheme-qualified uri an editor is opened on, e.g. `pebble:<id>`.
    pub fn resource_uri(&self, id: &str) -> String {
        format!("{}:{}", self.settings.resource_scheme, id)
    }

    /// Node behind a resource uri produced by [`Browser::resource_uri`].
    pub fn resolve_resource(&self, uri: &str) -> Option<&Node> {
        let id = uri
            .strip_prefix(self.settings.resource_scheme.as_str())?
            .strip_prefix(':')?;
        self.tree.get(id)
    }

    pub fn editor(&self, id: &str) -> Option<&EditorSession> {
        self.editors.get(id)
    }

    pub fn editor_mut(&mut self, id: &str) -> Option<&mut EditorSession> {
        self.editors.get_mut(id)
    }

    /// Connection owning `id`, cloned so adapter calls can run while the
    /// tree is mutated.
    pub(crate) fn connection_for(&self, id: &str) -> Result<Connection> {
        self.tree
            .connection_of(id)
            .cloned()
            .ok_or_else(|| BrowserError::logic(format!("{} has no connection", id)))
    }

    /// Id and uri of a collection node, or a logic error.
    pub(crate) fn collection_node(&self, id: &str) -> Result<(NodeId, String)> {
        let node = self.tree.node(id)?;
        if !node.is_collection() {
            return Err(BrowserError::logic(format!("{} is not a collection", id)));
        }
        Ok((node.id.clone(), node.uri.clone()))
    }

    /// Leaf names of `id`'s children.
    pub(crate) fn child_names(&self, id: &str) -> Vec<String> {
        self.tree
            .children(id)
            .iter()
            .filter_map(|child| self.tree.get(child.as_str()))
            .map(|child| child.name.clone())
            .collect()
    }

    /// Drop editor sessions on `id` and everything below it. Pending edits
    /// are discarded.
    pub(crate) fn close_editors_under(&mut self, id: &str) {
        let mut stack = vec![NodeId::from(id)];
        while let Some(next) = stack.pop() {
            stack.extend(self.tree.children(next.as_str()).iter().cloned());
            if let Some(session) = self.editors.remove(&next) {
                self.tree.events().emit(TreeEvent::EditorClosed {
                    uri: session.resource,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[test]
    fn test_logic_classification() {
        assert!(BrowserError::logic("x").is_logic());
        assert!(BrowserError::from(TreeError::NodeNotFound("x".into())).is_logic());
        assert!(!BrowserError::from(StoreError::Unreachable("x".into())).is_logic());
        assert!(!BrowserError::Validation("x".into()).is_logic());
    }

    #[test]
    fn test_resource_uri_round_trip() {
        let browser = Browser::new(InMemoryStore::new());
        let uri = browser.resource_uri(crate::node::ROOT_ID);
        assert_eq!(uri, "pebble:pebble-connections-view-root");
        assert!(browser.resolve_resource(&uri).is_some());
        assert!(browser.resolve_resource("other:pebble-connections-view-root").is_none());
    }
}
