//! Loading guard: keeps two loads from mutating the same subtree.
//!
//! A node may enter the loading state only when it is idle and no item
//! ancestor is loading. Whoever starts a load must end it on every path.

use tracing::trace;

use crate::node::NodeKind;
use crate::tree::TreeModel;

impl TreeModel {
    /// Try to move `id` from idle to loading.
    ///
    /// Returns `false` without side effects when the node is unknown, already
    /// loading, or sits below an item that is loading. The ancestor walk stops
    /// at the first non-item ancestor.
    pub fn start_loading(&mut self, id: &str) -> bool {
        match self.get(id) {
            Some(node) if !node.loading => {}
            _ => return false,
        }

        for ancestor in self.ancestors(id) {
            match self.kind_of(ancestor.as_str()) {
                Some(NodeKind::Item(_)) => {
                    if self.get(ancestor.as_str()).is_some_and(|node| node.loading) {
                        trace!("Load of {} refused, {} is loading", id, ancestor);
                        return false;
                    }
                }
                _ => break,
            }
        }

        if let Some(node) = self.get_mut(id) {
            node.loading = true;
        }
        self.touch(id);
        true
    }

    /// Return `id` to idle. Unknown ids are ignored.
    pub fn end_loading(&mut self, id: &str) {
        if let Some(node) = self.get_mut(id) {
            node.loading = false;
            self.touch(id);
        }
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.get(id).is_some_and(|node| node.loading)
    }
}
