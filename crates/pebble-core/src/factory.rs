//! Node construction.
//!
//! Every insertion goes through lookup-or-create keyed by the derived node
//! id, so loading the same listing twice never duplicates a node.

use tracing::debug;

use crate::browser::{Browser, BrowserError, Result};
use crate::item::{Collection, Connection, Document, Item};
use crate::node::{self, ConnectionNode, ItemNode, Node, NodeId, NodeKind, ROOT_ID};
use crate::path::{clean_items, collection_dir, leaf_name, parent_collection, SEPARATOR};
use crate::store::RemoteStore;

impl<S: RemoteStore> Browser<S> {
    /// Append a connection node under the root. An expanded node connects
    /// on the next [`Browser::on_expanded`].
    pub fn add_connection(&mut self, connection: Connection, expanded: bool) -> Result<NodeId> {
        let id = node::connection_id(&connection);
        let mut node = Node::new(
            id,
            connection.server.clone(),
            connection.name.clone(),
            NodeKind::Connection(ConnectionNode {
                connection,
                db: None,
                security: None,
            }),
        );
        node.expanded = expanded;
        Ok(self.tree.add_node(ROOT_ID, node)?)
    }

    /// Insert `item` under `parent`, or refresh the record of the node that
    /// already carries its id.
    ///
    /// Under a collection the record's name is rewritten to
    /// `parent uri + leaf`, which keeps every child's uri directly below its
    /// parent.
    pub fn add_item(&mut self, parent: &str, mut item: Item, is_new: bool) -> Result<NodeId> {
        let connection = self.connection_for(parent)?;
        let leaf = leaf_name(item.name()).to_string();
        let parent_node = self.tree.node(parent)?;
        if parent_node.is_collection() {
            item.set_name(collection_dir(&parent_node.uri, &leaf));
        }
        if let Item::Collection(collection) = &mut item {
            collection.collections.clear();
            collection.documents.clear();
        }
        let id = node::item_id(&connection, item.name());

        if let Some(existing) = self.tree.get_mut(id.as_str()) {
            let NodeKind::Item(current) = &mut existing.kind else {
                return Err(BrowserError::logic(format!("{} is not an item", id)));
            };
            if current.item.is_collection() != item.is_collection() {
                return Err(BrowserError::logic(format!("{} changed kind", id)));
            }
            current.item = item;
            current.is_new |= is_new;
            self.tree.touch(id.as_str());
            return Ok(id);
        }

        let uri = item.name().to_string();
        let node = Node::new(id, uri, leaf, NodeKind::Item(ItemNode { item, is_new }));
        Ok(self.tree.add_node(parent, node)?)
    }

    pub fn add_collection(&mut self, parent: &str, collection: Collection) -> Result<NodeId> {
        self.add_item(parent, Item::Collection(collection), false)
    }

    pub fn add_document(&mut self, parent: &str, document: Document, is_new: bool) -> Result<NodeId> {
        self.add_item(parent, Item::Document(document), is_new)
    }

    /// Make sure the collection at `uri` and all its ancestors exist under
    /// `connection_node`, inserting placeholders for missing ones.
    pub fn add_collection_recursive(&mut self, connection_node: &str, uri: &str) -> Result<NodeId> {
        if !uri.starts_with(SEPARATOR) || uri.ends_with(SEPARATOR) {
            return Err(BrowserError::logic(format!("Malformed collection uri: {:?}", uri)));
        }
        let connection = self.connection_for(connection_node)?;
        let id = node::item_id(&connection, uri);
        if let Some(existing) = self.tree.get(id.as_str()) {
            if !existing.is_collection() {
                return Err(BrowserError::logic(format!("{} is not a collection", id)));
            }
            return Ok(id);
        }

        let parent_uri = parent_collection(uri);
        if parent_uri.is_empty() {
            return Err(BrowserError::logic(format!("No root collection for {}", uri)));
        }
        let parent = self.add_collection_recursive(connection_node, &parent_uri)?;
        debug!("Adding placeholder collection {}", uri);
        let placeholder = Collection::new(
            uri,
            connection.username.as_str(),
            self.settings.default_group.as_str(),
        );
        self.add_collection(parent.as_str(), placeholder)
    }

    /// Insert `document` below its parent collection, creating the
    /// collection chain as needed.
    pub fn add_document_recursive(
        &mut self,
        connection_node: &str,
        document: Document,
        is_new: bool,
    ) -> Result<NodeId> {
        let parent = self.add_collection_recursive(connection_node, &parent_collection(&document.name))?;
        self.add_document(parent.as_str(), document, is_new)
    }

    /// Add the children of a listed collection below `parent`.
    pub(crate) fn insert_listing(
        &mut self,
        parent: &str,
        collections: Vec<Collection>,
        documents: Vec<Document>,
    ) -> Result<()> {
        let connection = self.connection_for(parent)?;
        let parent_uri = self.tree.node(parent)?.uri.clone();

        for collection in collections {
            self.add_collection(parent, collection)?;
        }
        for item in clean_items(documents, &parent_uri) {
            // A placeholder must not overwrite a listed collection.
            if item.is_collection() && self.tree.contains(node::item_id(&connection, item.name()).as_str()) {
                continue;
            }
            self.add_item(parent, item, false)?;
        }
        Ok(())
    }

    /// Replace the security subtree of a connection with fresh user and
    /// group listings.
    pub(crate) async fn add_security(&mut self, connection_node: &str) -> Result<NodeId> {
        let connection = self.connection_for(connection_node)?;
        let users = self.store.get_users(&connection).await?;
        let groups = self.store.get_groups(&connection).await?;

        let security = node::security_id(&connection);
        if self.tree.contains(security.as_str()) {
            self.tree.remove_node(security.as_str())?;
        }
        let node = Node::new(security.clone(), "/security", "Security", NodeKind::Security);
        self.tree.add_node(connection_node, node)?;

        let users_node = Node::new(node::users_id(&connection), "/users", "Users", NodeKind::Users);
        let users_parent = self.tree.add_node(security.as_str(), users_node)?;
        for user in &users {
            let node = Node::new(
                node::user_id(&connection, user),
                format!("/users/{}", user),
                user.as_str(),
                NodeKind::User,
            );
            self.tree.add_node(users_parent.as_str(), node)?;
        }

        let groups_node = Node::new(node::groups_id(&connection), "/groups", "Groups", NodeKind::Groups);
        let groups_parent = self.tree.add_node(security.as_str(), groups_node)?;
        for group in &groups {
            let node = Node::new(
                node::group_id(&connection, group),
                format!("/groups/{}", group),
                group.as_str(),
                NodeKind::Group,
            );
            self.tree.add_node(groups_parent.as_str(), node)?;
        }

        if let Some(NodeKind::Connection(payload)) =
            self.tree.get_mut(connection_node).map(|node| &mut node.kind)
        {
            merge_names(&mut payload.connection.users, users);
            merge_names(&mut payload.connection.groups, groups);
            payload.security = Some(security.clone());
        }
        Ok(security)
    }
}

/// Append names not already present, keeping the existing order.
fn merge_names(known: &mut Vec<String>, listed: Vec<String>) {
    for name in listed {
        if !known.contains(&name) {
            known.push(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    const CONN: &str = "admin@http://host";

    fn browser() -> Browser<InMemoryStore> {
        let mut browser = Browser::new(InMemoryStore::new());
        browser
            .add_connection(Connection::new("local", "http://host", "admin", ""), false)
            .unwrap();
        browser
            .add_collection(CONN, Collection::new("/db", "admin", "dba"))
            .unwrap();
        browser
    }

    #[test]
    fn test_connection_node_uses_derived_id() {
        let browser = browser();
        let node = browser.node(CONN).unwrap();
        assert_eq!(node.name, "local");
        assert_eq!(node.uri, "http://host");
        assert_eq!(node.parent.as_ref().unwrap().as_str(), ROOT_ID);
    }

    #[test]
    fn test_duplicate_connection_rejected() {
        let mut browser = browser();
        let err = browser
            .add_connection(Connection::new("again", "http://host", "admin", "x"), true)
            .unwrap_err();
        assert!(matches!(err, BrowserError::Tree(crate::tree::TreeError::DuplicateId(_))));
    }

    #[test]
    fn test_add_item_rewrites_name_below_parent() {
        let mut browser = browser();
        let parent = format!("{}/db", CONN);
        let id = browser
            .add_document(&parent, Document::new("/elsewhere/a.xml", "admin", "dba"), false)
            .unwrap();
        assert_eq!(id.as_str(), "admin@http://host/db/a.xml");
        let node = browser.node(id.as_str()).unwrap();
        assert_eq!(node.uri, "/db/a.xml");
        assert_eq!(node.name, "a.xml");
        assert_eq!(node.document().unwrap().name, "/db/a.xml");
    }

    #[test]
    fn test_add_is_lookup_or_create() {
        let mut browser = browser();
        let parent = format!("{}/db", CONN);
        let first = browser
            .add_document(&parent, Document::new("/db/a.xml", "admin", "dba"), false)
            .unwrap();
        let mut updated = Document::new("/db/a.xml", "guest", "guest");
        updated.size = 42;
        let second = browser.add_document(&parent, updated, false).unwrap();

        assert_eq!(first, second);
        assert_eq!(browser.tree().children(&parent).len(), 1);
        assert_eq!(browser.node(second.as_str()).unwrap().document().unwrap().size, 42);
    }

    #[test]
    fn test_kind_mismatch_is_logic_error() {
        let mut browser = browser();
        let parent = format!("{}/db", CONN);
        browser
            .add_document(&parent, Document::new("/db/x", "admin", "dba"), false)
            .unwrap();
        let err = browser
            .add_collection(&parent, Collection::new("/db/x", "admin", "dba"))
            .unwrap_err();
        assert!(err.is_logic());
    }

    #[test]
    fn test_collection_recursive_creates_chain() {
        let mut browser = browser();
        let id = browser.add_collection_recursive(CONN, "/db/a/b/c").unwrap();
        assert_eq!(id.as_str(), "admin@http://host/db/a/b/c");
        let chain: Vec<String> = browser
            .tree()
            .ancestors(id.as_str())
            .take(3)
            .map(|id| id.to_string())
            .collect();
        assert_eq!(
            chain,
            vec![
                "admin@http://host/db/a/b",
                "admin@http://host/db/a",
                "admin@http://host/db",
            ]
        );
        // idempotent
        assert_eq!(browser.add_collection_recursive(CONN, "/db/a/b/c").unwrap(), id);
    }

    #[test]
    fn test_collection_recursive_rejects_bad_input() {
        let mut browser = browser();
        assert!(browser.add_collection_recursive(CONN, "").unwrap_err().is_logic());
        assert!(browser.add_collection_recursive(CONN, "db/a").unwrap_err().is_logic());
        assert!(browser.add_collection_recursive(CONN, "/other/a").unwrap_err().is_logic());
        assert!(browser.add_collection_recursive(CONN, "/db/a/").unwrap_err().is_logic());
        assert!(browser.add_collection_recursive(CONN, "/").unwrap_err().is_logic());
        assert!(!browser.tree().contains("admin@http://host/db/a"));
    }

    #[test]
    fn test_document_recursive() {
        let mut browser = browser();
        let id = browser
            .add_document_recursive(CONN, Document::new("/db/x/y/z.xml", "admin", "dba"), true)
            .unwrap();
        let node = browser.node(id.as_str()).unwrap();
        assert!(node.is_new());
        assert_eq!(
            node.parent.as_ref().unwrap().as_str(),
            "admin@http://host/db/x/y"
        );
    }

    #[test]
    fn test_listing_folds_nested_documents() {
        let mut browser = browser();
        let parent = format!("{}/db", CONN);
        let collections = vec![Collection::new("/db/apps", "admin", "dba")];
        let documents = vec![
            Document::new("/db/a.xml", "admin", "dba"),
            Document::new("/db/apps/deep.xml", "admin", "dba"),
            Document::new("/db/tmp/deep.xml", "admin", "dba"),
        ];

        browser.insert_listing(&parent, collections, documents).unwrap();

        let names = browser.child_names(&parent);
        assert_eq!(names, vec!["apps", "a.xml", "tmp"]);
        assert!(browser.node("admin@http://host/db/tmp").unwrap().is_collection());
    }

    #[tokio::test]
    async fn test_security_subtree() {
        let mut browser = browser();
        let security = browser.add_security(CONN).await.unwrap();
        assert_eq!(security.as_str(), "admin@http://hostsecurity");

        let users = browser.child_names("admin@http://hostsecurity/users");
        assert_eq!(users, vec!["admin", "guest"]);
        let connection = browser.node(CONN).unwrap().connection().unwrap();
        assert_eq!(connection.groups, vec!["dba", "guest"]);

        // reconnecting replaces rather than duplicates
        browser.add_security(CONN).await.unwrap();
        assert_eq!(browser.tree().children(CONN).len(), 2);
        let connection = browser.node(CONN).unwrap().connection().unwrap();
        assert_eq!(connection.users, vec!["admin", "guest"]);
    }

    #[tokio::test]
    async fn test_security_appends_to_known_names() {
        let mut browser = browser();
        if let Some(NodeKind::Connection(payload)) = browser.tree_mut().get_mut(CONN).map(|node| &mut node.kind) {
            payload.connection.users = vec!["editor".to_string(), "admin".to_string()];
        }
        browser.add_security(CONN).await.unwrap();

        let connection = browser.node(CONN).unwrap().connection().unwrap();
        assert_eq!(connection.users, vec!["editor", "admin", "guest"]);
        assert_eq!(connection.groups, vec!["dba", "guest"]);
    }
}
