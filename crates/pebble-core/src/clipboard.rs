//! Cut, copy and paste of tree selections.

use tracing::debug;

use crate::browser::{Browser, BrowserError, Result};
use crate::mutation::MoveOperation;
use crate::node::NodeId;
use crate::path::{collection_dir, is_within, leaf_name};
use crate::store::RemoteStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clipboard {
    pub source: Vec<NodeId>,
    /// Copy rather than move on paste
    pub copy: bool,
}

impl Clipboard {
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

/// A destination is valid unless it equals or lies below one of the
/// sources.
pub fn can_move_to<S: AsRef<str>>(sources: &[S], destination: &str) -> bool {
    !sources
        .iter()
        .any(|source| is_within(destination, source.as_ref()))
}

impl<S: RemoteStore> Browser<S> {
    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn cut(&mut self) {
        self.fill_clipboard(false);
    }

    pub fn copy(&mut self) {
        self.fill_clipboard(true);
    }

    fn fill_clipboard(&mut self, copy: bool) {
        let source = self.tree.top_nodes(self.tree.selection());
        debug!("Clipboard holds {} items (copy: {})", source.len(), copy);
        self.clipboard = Clipboard { source, copy };
    }

    /// [`can_move_to`] over node ids. Unknown sources are ignored.
    pub fn can_move_nodes_to(&self, sources: &[NodeId], destination: &str) -> bool {
        let uris: Vec<&str> = sources
            .iter()
            .filter_map(|id| self.tree.get(id.as_str()))
            .map(|node| node.uri.as_str())
            .collect();
        can_move_to(&uris, destination)
    }

    /// Whether the clipboard can be pasted into the selected collection.
    pub fn can_paste(&self) -> bool {
        match self.tree.selected_node() {
            Some(target) if target.is_collection() && !self.clipboard.is_empty() => {
                self.can_move_nodes_to(&self.clipboard.source, &target.uri)
            }
            _ => false,
        }
    }

    /// Move or copy the clipboard into the selected collection. A cut
    /// clipboard is emptied once pasted.
    pub async fn paste(&mut self) -> Result<Vec<NodeId>> {
        if !self.can_paste() {
            return Err(BrowserError::Validation("nothing to paste here".to_string()));
        }
        let Some(target) = self.tree.selected_node() else {
            return Ok(Vec::new());
        };
        let container = target.id.clone();
        let target_uri = target.uri.clone();

        let (source, destination): (Vec<NodeId>, Vec<String>) = self
            .clipboard
            .source
            .iter()
            .filter_map(|id| self.tree.get(id.as_str()))
            .map(|node| (node.id.clone(), collection_dir(&target_uri, leaf_name(&node.uri))))
            .unzip();

        let copy = self.clipboard.copy;
        let pasted = self
            .move_items(MoveOperation {
                source,
                destination,
                destination_container: container,
                copy,
            })
            .await?;
        if !copy {
            self.clipboard = Clipboard::default();
        }
        Ok(pasted)
    }
}
