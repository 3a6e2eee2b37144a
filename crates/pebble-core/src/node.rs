//! Tree nodes and their identity scheme.
//!
//! A node id is a pure function of the owning connection and the node's uri:
//! `username@server` followed by the uri for items, or a `security` suffix for
//! the security subtree. Ids change whenever a uri changes, so renames and
//! moves are always remove-then-reinsert.

use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;

use crate::item::{Collection, Connection, Document, Item};

/// Id of the hidden root node.
pub const ROOT_ID: &str = "pebble-connections-view-root";
/// Id of the single toolbar node.
pub const TOOLBAR_ID: &str = "pebble-toolbar";

const GUEST: &str = "(guest)";

/// Globally unique node id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// `username@server`, or `(guest)@server` without a username.
pub fn connection_id(connection: &Connection) -> NodeId {
    let user = if connection.is_guest() {
        GUEST
    } else {
        connection.username.as_str()
    };
    NodeId(format!("{}@{}", user, connection.server))
}

/// Connection id followed by the item's uri.
pub fn item_id(connection: &Connection, uri: &str) -> NodeId {
    NodeId(format!("{}{}", connection_id(connection), uri))
}

pub fn security_id(connection: &Connection) -> NodeId {
    NodeId(format!("{}security", connection_id(connection)))
}

pub fn users_id(connection: &Connection) -> NodeId {
    NodeId(format!("{}/users", security_id(connection)))
}

pub fn user_id(connection: &Connection, user: &str) -> NodeId {
    NodeId(format!("{}/{}", users_id(connection), user))
}

pub fn groups_id(connection: &Connection) -> NodeId {
    NodeId(format!("{}/groups", security_id(connection)))
}

pub fn group_id(connection: &Connection, group: &str) -> NodeId {
    NodeId(format!("{}/{}", groups_id(connection), group))
}

/// Payload of a connection node.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionNode {
    pub connection: Connection,
    /// Root collection, set once connected
    pub db: Option<NodeId>,
    pub security: Option<NodeId>,
}

/// Payload of an item node.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemNode {
    pub item: Item,
    /// Created locally and not yet saved
    pub is_new: bool,
}

/// Variant-specific part of a node.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    Root,
    Toolbar,
    Connection(ConnectionNode),
    Item(ItemNode),
    Security,
    Users,
    User,
    Groups,
    Group,
}

impl NodeKind {
    /// Whether nodes of this kind can hold children.
    pub fn is_composite(&self) -> bool {
        match self {
            NodeKind::Root
            | NodeKind::Connection(_)
            | NodeKind::Security
            | NodeKind::Users
            | NodeKind::Groups => true,
            NodeKind::Item(item) => item.item.is_collection(),
            NodeKind::Toolbar | NodeKind::User | NodeKind::Group => false,
        }
    }
}

/// One element of the tree.
///
/// Parent and children are id references into the owning
/// [`TreeModel`](crate::tree::TreeModel).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub uri: String,
    pub name: String,
    pub parent: Option<NodeId>,
    pub selected: bool,
    pub loading: bool,
    pub expanded: bool,
    pub loaded: bool,
    pub children: Vec<NodeId>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: NodeId, uri: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            uri: uri.into(),
            name: name.into(),
            parent: None,
            selected: false,
            loading: false,
            expanded: false,
            loaded: false,
            children: Vec::new(),
            kind,
        }
    }

    pub fn root() -> Self {
        Self::new(NodeId::from(ROOT_ID), "", "Pebble Connections Root", NodeKind::Root)
    }

    pub fn toolbar() -> Self {
        Self::new(NodeId::from(TOOLBAR_ID), "toolbar", "Pebble Toolbar", NodeKind::Toolbar)
    }

    pub fn is_composite(&self) -> bool {
        self.kind.is_composite()
    }

    pub fn is_toolbar(&self) -> bool {
        matches!(self.kind, NodeKind::Toolbar)
    }

    pub fn is_connection(&self) -> bool {
        matches!(self.kind, NodeKind::Connection(_))
    }

    pub fn is_item(&self) -> bool {
        matches!(self.kind, NodeKind::Item(_))
    }

    pub fn is_collection(&self) -> bool {
        match &self.kind {
            NodeKind::Item(item) => item.item.is_collection(),
            _ => false,
        }
    }

    pub fn is_document(&self) -> bool {
        match &self.kind {
            NodeKind::Item(item) => !item.item.is_collection(),
            _ => false,
        }
    }

    pub fn item(&self) -> Option<&Item> {
        match &self.kind {
            NodeKind::Item(item) => Some(&item.item),
            _ => None,
        }
    }

    pub fn item_mut(&mut self) -> Option<&mut Item> {
        match &mut self.kind {
            NodeKind::Item(item) => Some(&mut item.item),
            _ => None,
        }
    }

    pub fn collection(&self) -> Option<&Collection> {
        match self.item() {
            Some(Item::Collection(collection)) => Some(collection),
            _ => None,
        }
    }

    pub fn document(&self) -> Option<&Document> {
        match self.item() {
            Some(Item::Document(document)) => Some(document),
            _ => None,
        }
    }

    pub fn connection(&self) -> Option<&Connection> {
        match &self.kind {
            NodeKind::Connection(node) => Some(&node.connection),
            _ => None,
        }
    }

    pub fn is_new(&self) -> bool {
        match &self.kind {
            NodeKind::Item(item) => item.is_new,
            _ => false,
        }
    }
}
