//! Tree model: an arena of nodes keyed by id.
//!
//! Parent and child links are ids, never references, so the structure has no
//! cycles and the whole model can be serialized. Every structural change is
//! published on the model's [`EventBus`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::events::{EventBus, TreeEvent};
use crate::item::Connection;
use crate::node::{Node, NodeId, NodeKind, ROOT_ID};

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Duplicate node id: {0}")]
    DuplicateId(String),

    #[error("Node cannot hold children: {0}")]
    NotComposite(String),

    #[error("Node cannot be removed: {0}")]
    Protected(String),
}

pub type Result<T> = std::result::Result<T, TreeError>;

/// Owns every live node plus the current selection.
pub struct TreeModel {
    nodes: HashMap<NodeId, Node>,
    selection: Vec<NodeId>,
    events: Arc<EventBus>,
}

impl Default for TreeModel {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeModel {
    /// Create a model holding the hidden root and the toolbar.
    pub fn new() -> Self {
        Self::with_events(Arc::new(EventBus::new()))
    }

    pub fn with_events(events: Arc<EventBus>) -> Self {
        let root = Node::root();
        let mut nodes = HashMap::new();
        nodes.insert(root.id.clone(), root);

        let mut model = Self {
            nodes,
            selection: Vec::new(),
            events,
        };
        // The root is composite and the toolbar id is fresh, this cannot fail.
        let _ = model.add_node(ROOT_ID, Node::toolbar());
        model
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn root(&self) -> &Node {
        &self.nodes[ROOT_ID]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable access without notification; pair with [`TreeModel::touch`].
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn node(&self, id: &str) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))
    }

    pub fn node_mut(&mut self, id: &str) -> Result<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::NodeNotFound(id.to_string()))
    }

    pub fn children(&self, id: &str) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Child of `parent` whose leaf name is `name`.
    pub fn find_child(&self, parent: &str, name: &str) -> Option<&Node> {
        self.children(parent)
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .find(|child| child.name == name)
    }

    /// Append `node` to `parent`'s children.
    pub fn add_node(&mut self, parent: &str, node: Node) -> Result<NodeId> {
        let index = self.children(parent).len();
        self.insert_node(parent, index, node)
    }

    /// Insert `node` at `index` among `parent`'s children.
    pub fn insert_node(&mut self, parent: &str, index: usize, mut node: Node) -> Result<NodeId> {
        if self.nodes.contains_key(&node.id) {
            return Err(TreeError::DuplicateId(node.id.to_string()));
        }
        let parent_node = self
            .nodes
            .get_mut(parent)
            .ok_or_else(|| TreeError::NodeNotFound(parent.to_string()))?;
        if !parent_node.is_composite() {
            return Err(TreeError::NotComposite(parent.to_string()));
        }

        let id = node.id.clone();
        let index = index.min(parent_node.children.len());
        parent_node.children.insert(index, id.clone());
        node.parent = Some(parent_node.id.clone());
        let parent_id = parent_node.id.clone();
        self.nodes.insert(id.clone(), node);

        debug!("Added node {} under {}", id, parent_id);
        self.events.emit(TreeEvent::NodeAdded {
            id: id.clone(),
            parent: parent_id,
        });
        Ok(id)
    }

    /// Detach `id` and drop its whole subtree. Returns the detached node.
    pub fn remove_node(&mut self, id: &str) -> Result<Node> {
        if id == ROOT_ID {
            return Err(TreeError::Protected(id.to_string()));
        }
        let node = self.node(id)?;
        let parent = node.parent.clone();

        let mut doomed = Vec::new();
        let mut stack = vec![node.id.clone()];
        while let Some(next) = stack.pop() {
            stack.extend(self.children(next.as_str()).iter().cloned());
            doomed.push(next);
        }

        if let Some(parent) = parent.as_ref().and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|child| child.as_str() != id);
        }

        let mut removed = None;
        for doomed_id in &doomed {
            let node = self.nodes.remove(doomed_id);
            if doomed_id.as_str() == id {
                removed = node;
            }
        }

        let before = self.selection.len();
        let gone: HashSet<&NodeId> = doomed.iter().collect();
        self.selection.retain(|selected| !gone.contains(selected));
        if self.selection.len() != before {
            self.emit_selection();
        }

        debug!("Removed node {} ({} nodes in subtree)", id, doomed.len());
        self.events.emit(TreeEvent::NodeRemoved { id: NodeId::from(id) });
        removed.ok_or_else(|| TreeError::NodeNotFound(id.to_string()))
    }

    /// Remove every child of `id`.
    pub fn empty(&mut self, id: &str) -> Result<()> {
        while let Some(last) = self.node(id)?.children.last().cloned() {
            self.remove_node(last.as_str())?;
        }
        Ok(())
    }

    /// Parent ids from the direct parent up to the root.
    pub fn ancestors(&self, id: &str) -> Ancestors<'_> {
        Ancestors {
            model: self,
            next: self.nodes.get(id).and_then(|node| node.parent.clone()),
        }
    }

    /// The connection node owning `id` (inclusive).
    pub fn connection_node_of(&self, id: &str) -> Option<&Node> {
        let node = self.nodes.get(id)?;
        if node.is_connection() {
            return Some(node);
        }
        self.ancestors(id)
            .filter_map(|ancestor| self.nodes.get(&ancestor))
            .find(|ancestor| ancestor.is_connection())
    }

    pub fn connection_of(&self, id: &str) -> Option<&Connection> {
        self.connection_node_of(id).and_then(Node::connection)
    }

    /// All connection nodes in display order.
    pub fn connections(&self) -> Vec<&Node> {
        self.children(ROOT_ID)
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|node| node.is_connection())
            .collect()
    }

    // Selection

    pub fn selection(&self) -> &[NodeId] {
        &self.selection
    }

    /// First selected node.
    pub fn selected_node(&self) -> Option<&Node> {
        self.selection.first().and_then(|id| self.nodes.get(id))
    }

    /// Replace the selection with `id`. Toolbar nodes are never selectable.
    pub fn select(&mut self, id: &str) -> Result<()> {
        if self.node(id)?.is_toolbar() {
            return Ok(());
        }
        self.set_selected_flags(false);
        self.selection = vec![NodeId::from(id)];
        self.set_selected_flags(true);
        self.emit_selection();
        Ok(())
    }

    /// Extend the selection with `id`.
    pub fn add_to_selection(&mut self, id: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.is_toolbar() || node.selected {
            return Ok(());
        }
        node.selected = true;
        self.selection.push(NodeId::from(id));
        self.emit_selection();
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.set_selected_flags(false);
        self.selection.clear();
        self.emit_selection();
    }

    fn set_selected_flags(&mut self, selected: bool) {
        for id in &self.selection {
            if let Some(node) = self.nodes.get_mut(id) {
                node.selected = selected;
            }
        }
    }

    fn emit_selection(&self) {
        self.events.emit(TreeEvent::SelectionChanged {
            ids: self.selection.clone(),
        });
    }

    /// Item nodes from `ids` that have no item ancestor also in `ids`.
    pub fn top_nodes(&self, ids: &[NodeId]) -> Vec<NodeId> {
        let chosen: HashSet<&NodeId> = ids.iter().collect();
        ids.iter()
            .filter(|id| self.nodes.get(*id).is_some_and(Node::is_item))
            .filter(|id| {
                !self.ancestors(id.as_str()).any(|ancestor| {
                    chosen.contains(&ancestor)
                        && self.nodes.get(&ancestor).is_some_and(Node::is_item)
                })
            })
            .cloned()
            .collect()
    }

    // Expansion and flags

    pub fn expand(&mut self, id: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.is_composite() && !node.expanded {
            node.expanded = true;
            self.touch(id);
        }
        Ok(())
    }

    pub fn collapse(&mut self, id: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.expanded {
            node.expanded = false;
            self.touch(id);
        }
        Ok(())
    }

    pub fn set_loaded(&mut self, id: &str, loaded: bool) -> Result<()> {
        self.node_mut(id)?.loaded = loaded;
        self.touch(id);
        Ok(())
    }

    /// Announce that `id` changed in place.
    pub fn touch(&self, id: &str) {
        self.events.emit(TreeEvent::NodeChanged { id: NodeId::from(id) });
    }

    /// Request a full repaint.
    pub fn refresh(&self) {
        self.events.emit(TreeEvent::Refresh);
    }

    /// Pre-order walk from the root with depths (root excluded).
    pub fn walk(&self) -> Vec<(usize, &Node)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, &NodeId)> = self
            .children(ROOT_ID)
            .iter()
            .rev()
            .map(|id| (0, id))
            .collect();
        while let Some((depth, id)) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                out.push((depth, node));
                stack.extend(node.children.iter().rev().map(|child| (depth + 1, child)));
            }
        }
        out
    }

    pub(crate) fn kind_of(&self, id: &str) -> Option<&NodeKind> {
        self.nodes.get(id).map(|node| &node.kind)
    }
}

/// Iterator over ancestor ids, nearest first.
pub struct Ancestors<'a> {
    model: &'a TreeModel,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next.take()?;
        self.next = self
            .model
            .nodes
            .get(&current)
            .and_then(|node| node.parent.clone());
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Collection, Document};
    use crate::node::{ItemNode, TOOLBAR_ID};
    use std::sync::Mutex;

    fn collection(uri: &str) -> Node {
        Node::new(
            NodeId::from(uri),
            uri,
            crate::path::leaf_name(uri),
            NodeKind::Item(ItemNode {
                item: Collection::new(uri, "admin", "dba").into(),
                is_new: false,
            }),
        )
    }

    fn document(uri: &str) -> Node {
        Node::new(
            NodeId::from(uri),
            uri,
            crate::path::leaf_name(uri),
            NodeKind::Item(ItemNode {
                item: Document::new(uri, "admin", "dba").into(),
                is_new: false,
            }),
        )
    }

    fn sample() -> TreeModel {
        let mut model = TreeModel::new();
        model.add_node(ROOT_ID, collection("/db")).unwrap();
        model.add_node("/db", collection("/db/a")).unwrap();
        model.add_node("/db/a", document("/db/a/x.xml")).unwrap();
        model.add_node("/db/a", collection("/db/a/sub")).unwrap();
        model.add_node("/db", document("/db/y.xml")).unwrap();
        model
    }

    #[test]
    fn test_new_model_has_toolbar() {
        let model = TreeModel::new();
        assert_eq!(model.children(ROOT_ID), &[NodeId::from(TOOLBAR_ID)]);
        assert!(model.root().parent.is_none());
    }

    #[test]
    fn test_add_rejects_duplicates_and_leaf_parents() {
        let mut model = sample();
        assert!(matches!(
            model.add_node("/db", collection("/db/a")),
            Err(TreeError::DuplicateId(_))
        ));
        assert!(matches!(
            model.add_node("/db/y.xml", document("/db/y.xml/z")),
            Err(TreeError::NotComposite(_))
        ));
        assert!(matches!(
            model.add_node("/nope", document("/nope/z")),
            Err(TreeError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_remove_drops_subtree_and_selection() {
        let mut model = sample();
        model.select("/db/a/x.xml").unwrap();

        let removed = model.remove_node("/db/a").unwrap();
        assert_eq!(removed.id.as_str(), "/db/a");
        assert!(!model.contains("/db/a/x.xml"));
        assert!(!model.contains("/db/a/sub"));
        assert_eq!(model.children("/db"), &[NodeId::from("/db/y.xml")]);
        assert!(model.selection().is_empty());
    }

    #[test]
    fn test_root_is_protected() {
        let mut model = sample();
        assert!(matches!(model.remove_node(ROOT_ID), Err(TreeError::Protected(_))));
    }

    #[test]
    fn test_empty_removes_children() {
        let mut model = sample();
        model.empty("/db").unwrap();
        assert!(model.children("/db").is_empty());
        assert_eq!(model.len(), 3);
    }

    #[test]
    fn test_insert_at_position() {
        let mut model = sample();
        model.insert_node("/db", 0, document("/db/first.xml")).unwrap();
        assert_eq!(model.children("/db")[0].as_str(), "/db/first.xml");
    }

    #[test]
    fn test_ancestors_walk_to_root() {
        let model = sample();
        let chain: Vec<String> = model
            .ancestors("/db/a/sub")
            .map(|id| id.to_string())
            .collect();
        assert_eq!(chain, vec!["/db/a", "/db", ROOT_ID]);
    }

    #[test]
    fn test_top_nodes_skip_nested_selection() {
        let model = sample();
        let ids: Vec<NodeId> = ["/db/a/x.xml", "/db/a", "/db/y.xml", "/db/a/sub"]
            .into_iter()
            .map(NodeId::from)
            .collect();
        let top = model.top_nodes(&ids);
        assert_eq!(top, vec![NodeId::from("/db/a"), NodeId::from("/db/y.xml")]);
    }

    #[test]
    fn test_toolbar_is_not_selectable() {
        let mut model = sample();
        model.select(TOOLBAR_ID).unwrap();
        assert!(model.selection().is_empty());
    }

    #[test]
    fn test_multi_selection_flags() {
        let mut model = sample();
        model.select("/db/a").unwrap();
        model.add_to_selection("/db/y.xml").unwrap();
        assert!(model.get("/db/a").unwrap().selected);
        assert_eq!(model.selection().len(), 2);

        model.select("/db/y.xml").unwrap();
        assert!(!model.get("/db/a").unwrap().selected);
        assert_eq!(model.selected_node().unwrap().id.as_str(), "/db/y.xml");
    }

    #[test]
    fn test_walk_is_preorder() {
        let model = sample();
        let order: Vec<(usize, &str)> = model
            .walk()
            .into_iter()
            .map(|(depth, node)| (depth, node.id.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (0, TOOLBAR_ID),
                (0, "/db"),
                (1, "/db/a"),
                (2, "/db/a/x.xml"),
                (2, "/db/a/sub"),
                (1, "/db/y.xml"),
            ]
        );
    }

    #[test]
    fn test_structural_changes_are_published() {
        let events = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = events.subscribe(move |event| sink.lock().unwrap().push(event));

        let mut model = TreeModel::with_events(events);
        model.add_node(ROOT_ID, collection("/db")).unwrap();
        model.remove_node("/db").unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen.contains(&TreeEvent::NodeAdded {
            id: NodeId::from("/db"),
            parent: NodeId::from(ROOT_ID),
        }));
        assert!(seen.contains(&TreeEvent::NodeRemoved { id: NodeId::from("/db") }));
    }

    #[test]
    fn test_model_serializes() {
        let model = sample();
        let json = serde_json::to_value(model.get("/db/a").unwrap()).unwrap();
        assert_eq!(json["type"], "item");
        assert_eq!(json["children"][0], "/db/a/x.xml");
        assert_eq!(json["parent"], "/db");
    }
}
