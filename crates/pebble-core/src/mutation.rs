//! Move, rename, delete and create.
//!
//! Every change is sent to the store first; the tree only follows once the
//! store reports success. Batch operations keep going past individual
//! failures and report what went through.

use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

use crate::browser::{Browser, BrowserError, Result};
use crate::item::{Connection, Document, media_type_for};
use crate::loader::LoadOutcome;
use crate::naming::{name_available, untitled_name};
use crate::node::{self, ConnectionNode, Node, NodeId, NodeKind, ROOT_ID};
use crate::path::collection_dir;
use crate::store::RemoteStore;
use crate::template::Template;

/// Move or copy `source[i]` to `destination[i]`, inserting the results below
/// `destination_container`.
#[derive(Debug, Clone)]
pub struct MoveOperation {
    pub source: Vec<NodeId>,
    pub destination: Vec<String>,
    pub destination_container: NodeId,
    pub copy: bool,
}

/// Shown to the user before anything is deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletePrompt {
    pub collections: Vec<String>,
    pub documents: Vec<String>,
}

#[derive(Debug, Default)]
pub struct DeleteReport {
    pub deleted: Vec<NodeId>,
    pub failed: Vec<(NodeId, String)>,
    /// The user declined the prompt
    pub cancelled: bool,
}

struct DeleteTarget {
    id: NodeId,
    connection: Connection,
    uri: String,
    is_collection: bool,
}

impl<S: RemoteStore> Browser<S> {
    /// Run a move batch sequentially, in order.
    ///
    /// Returns the ids of the nodes that now exist at the destinations.
    /// Sources the store refused or failed on are logged and left untouched.
    pub async fn move_items(&mut self, operation: MoveOperation) -> Result<Vec<NodeId>> {
        if operation.source.len() != operation.destination.len() {
            return Err(BrowserError::logic(format!(
                "{} sources for {} destinations",
                operation.source.len(),
                operation.destination.len()
            )));
        }
        let container = operation.destination_container.as_str();
        if !self.tree.node(container)?.is_composite() {
            return Err(BrowserError::logic(format!("{} cannot hold children", container)));
        }

        let mut moved = Vec::new();
        for (source, destination) in operation.source.iter().zip(&operation.destination) {
            let Some(node) = self.tree.get(source.as_str()) else {
                warn!("Skipping {}, it is no longer in the tree", source);
                continue;
            };
            let Some(item) = node.item().cloned() else {
                return Err(BrowserError::logic(format!("{} is not an item", source)));
            };
            let uri = node.uri.clone();
            let connection = self.connection_for(source.as_str())?;

            let done = self
                .store
                .move_item(&connection, &uri, destination, item.is_collection(), operation.copy)
                .await;
            match done {
                Ok(true) => {}
                Ok(false) => {
                    warn!("Server declined moving {} to {}", uri, destination);
                    continue;
                }
                Err(e) => {
                    error!("Failed to move {} to {}: {}", uri, destination, e);
                    continue;
                }
            }

            let is_collection = item.is_collection();
            let mut record = item;
            record.set_name(destination.as_str());
            let target = self.add_item(container, record, false)?;
            if !operation.copy && target != *source {
                if is_collection {
                    self.close_editors_under(source.as_str());
                } else if let Some(mut session) = self.editors.remove(source) {
                    session.resource = self.resource_uri(target.as_str());
                    self.editors.insert(target.clone(), session);
                }
                self.tree.remove_node(source.as_str())?;
            }
            moved.push(target);
        }

        info!(
            "{} {}/{} items",
            if operation.copy { "Copied" } else { "Moved" },
            moved.len(),
            operation.source.len()
        );
        Ok(moved)
    }

    /// Give an item a new leaf name within its collection. The renamed node
    /// is selected.
    pub async fn rename(&mut self, id: &str, name: &str) -> Result<NodeId> {
        let node = self.tree.node(id)?;
        if !node.is_item() {
            return Err(BrowserError::logic(format!("{} is not an item", id)));
        }
        let source = node.id.clone();
        let current = node.name.clone();
        let parent = node
            .parent
            .clone()
            .ok_or_else(|| BrowserError::logic(format!("{} has no parent", id)))?;
        let (parent, parent_uri) = self
            .collection_node(parent.as_str())
            .map_err(|_| BrowserError::logic(format!("{} is not inside a collection", id)))?;

        if name == current {
            return Ok(source);
        }
        let siblings = self.child_names(parent.as_str());
        if !name_available(&siblings, name) {
            return Err(BrowserError::Validation(name.to_string()));
        }

        let destination = collection_dir(&parent_uri, name);
        let moved = self
            .move_items(MoveOperation {
                source: vec![source],
                destination: vec![destination.clone()],
                destination_container: parent,
                copy: false,
            })
            .await?;
        match moved.as_slice() {
            [renamed] => {
                self.tree.select(renamed.as_str())?;
                Ok(renamed.clone())
            }
            _ => Err(BrowserError::Rejected {
                operation: "rename",
                uri: destination,
            }),
        }
    }

    /// Delete the selected items after `confirm` approves the prompt.
    ///
    /// Only top nodes of the selection are sent to the store; their
    /// descendants go with them.
    pub async fn delete_selection(
        &mut self,
        confirm: impl FnOnce(&DeletePrompt) -> bool,
    ) -> Result<DeleteReport> {
        let selection = self.tree.selection().to_vec();
        let top = self.tree.top_nodes(&selection);
        if top.is_empty() {
            return Ok(DeleteReport::default());
        }

        let mut prompt = DeletePrompt::default();
        for id in &top {
            let node = self.tree.node(id.as_str())?;
            if node.is_collection() {
                prompt.collections.push(node.name.clone());
            } else {
                prompt.documents.push(node.name.clone());
            }
        }
        if !confirm(&prompt) {
            if let Some(first) = selection.first() {
                self.tree.select(first.as_str())?;
            }
            return Ok(DeleteReport {
                cancelled: true,
                ..DeleteReport::default()
            });
        }

        self.delete_nodes(&top).await
    }

    /// Delete items without asking. Store calls run concurrently.
    pub async fn delete_nodes(&mut self, ids: &[NodeId]) -> Result<DeleteReport> {
        let mut targets = Vec::new();
        for id in ids {
            let node = self.tree.node(id.as_str())?;
            if !node.is_item() {
                return Err(BrowserError::logic(format!("{} is not an item", id)));
            }
            targets.push(DeleteTarget {
                id: node.id.clone(),
                connection: self.connection_for(id.as_str())?,
                uri: node.uri.clone(),
                is_collection: node.is_collection(),
            });
        }
        for target in &targets {
            if let Some(node) = self.tree.get_mut(target.id.as_str()) {
                node.loading = true;
            }
            self.tree.touch(target.id.as_str());
        }

        let store = &self.store;
        let outcomes = join_all(
            targets
                .iter()
                .map(|target| store.remove(&target.connection, &target.uri, target.is_collection)),
        )
        .await;

        let mut report = DeleteReport::default();
        for (target, outcome) in targets.into_iter().zip(outcomes) {
            match outcome {
                Ok(true) => {
                    self.close_editors_under(target.id.as_str());
                    self.tree.remove_node(target.id.as_str())?;
                    report.deleted.push(target.id);
                }
                Ok(false) => {
                    warn!("Server declined deleting {}", target.uri);
                    self.tree.end_loading(target.id.as_str());
                    report.failed.push((target.id, "declined".to_string()));
                }
                Err(e) => {
                    error!("Failed to delete {}: {}", target.uri, e);
                    self.tree.end_loading(target.id.as_str());
                    report.failed.push((target.id, e.to_string()));
                }
            }
        }
        info!("Deleted {}/{} items", report.deleted.len(), ids.len());
        Ok(report)
    }

    /// Create an empty collection named `name` below the collection `parent`.
    pub async fn create_collection(&mut self, parent: &str, name: &str) -> Result<NodeId> {
        let (parent, parent_uri) = self.collection_node(parent)?;
        self.check_new_name(parent.as_str(), name)?;
        let uri = collection_dir(&parent_uri, name);
        let connection = self.connection_for(parent.as_str())?;

        let collection = self
            .store
            .new_collection(&connection, &uri)
            .await
            .inspect_err(|e| error!("Failed to create collection {}: {}", uri, e))?;
        let id = self.add_collection(parent.as_str(), collection)?;
        self.tree.set_loaded(id.as_str(), true)?;
        info!("Created collection {}", uri);
        Ok(id)
    }

    /// Create a local document below `parent` and open it for editing.
    ///
    /// Nothing reaches the store until the document is saved. Non-empty
    /// `content` is pushed into the editor as one edit, leaving it dirty.
    pub fn create_document(&mut self, parent: &str, name: &str, content: &str) -> Result<NodeId> {
        let (parent, parent_uri) = self.collection_node(parent)?;
        self.check_new_name(parent.as_str(), name)?;
        let connection = self.connection_for(parent.as_str())?;

        let uri = collection_dir(&parent_uri, name);
        let owner = if connection.is_guest() { "guest" } else { connection.username.as_str() };
        let mut document = Document::new(uri.as_str(), owner, self.settings.default_group.as_str());
        document.media_type = media_type_for(&uri, &self.settings.default_media_type);
        document.size = content.len() as u64;

        let id = self.add_document(parent.as_str(), document, true)?;
        self.open_document(id.as_str())?;
        if let Some(editor) = self.editors.get_mut(&id) {
            editor.seed(content);
        }
        info!("Created document {}", uri);
        Ok(id)
    }

    /// Create a document from `template`. The file name comes from
    /// `params["name"]`, gaining the template's extension when it has none.
    pub fn create_from_template(
        &mut self,
        parent: &str,
        template: &Template,
        params: &BTreeMap<String, String>,
    ) -> Result<NodeId> {
        let name = params
            .get("name")
            .filter(|name| !name.is_empty())
            .ok_or_else(|| BrowserError::Validation("missing name".to_string()))?;
        let name = match template.ext.as_deref() {
            Some(ext) if !name.contains('.') => format!("{}.{}", name, ext),
            _ => name.clone(),
        };
        let text = template.render(params);
        self.create_document(parent, &name, &text)
    }

    /// Lowest `untitled-<n>[.ext]` not taken inside `collection`.
    pub fn new_name(&self, collection: &str, ext: Option<&str>) -> String {
        let siblings = self.child_names(collection);
        untitled_name(&self.settings.untitled_stem, ext, |name| {
            name_available(&siblings, name)
        })
    }

    /// Change owner and group of an item.
    pub async fn change_owner(&mut self, id: &str, owner: &str, group: &str) -> Result<()> {
        let node = self.tree.node(id)?;
        let Some(item) = node.item() else {
            return Err(BrowserError::logic(format!("{} is not an item", id)));
        };
        let (id, uri, is_collection) = (node.id.clone(), node.uri.clone(), item.is_collection());
        let connection = self.connection_for(id.as_str())?;

        let changed = self
            .store
            .chmod(&connection, &uri, owner, group, is_collection)
            .await
            .inspect_err(|e| error!("Failed to change owner of {}: {}", uri, e))?;
        if !changed {
            return Err(BrowserError::Rejected { operation: "chown", uri });
        }
        if let Some(item) = self.tree.get_mut(id.as_str()).and_then(Node::item_mut) {
            item.set_ownership(owner, group);
        }
        self.tree.touch(id.as_str());
        Ok(())
    }

    /// Apply an edited property sheet: rename first, then change ownership
    /// when it differs. Returns the item's id after the rename.
    pub async fn update_properties(
        &mut self,
        id: &str,
        name: &str,
        owner: &str,
        group: &str,
    ) -> Result<NodeId> {
        let id = self.rename(id, name).await?;
        let item = self
            .tree
            .node(id.as_str())?
            .item()
            .ok_or_else(|| BrowserError::logic(format!("{} is not an item", id)))?;
        if item.owner() != owner || item.group() != group {
            self.change_owner(id.as_str(), owner, group).await?;
        }
        Ok(id)
    }

    /// Drop a connection and everything below it from the tree.
    pub fn remove_connection(&mut self, id: &str) -> Result<()> {
        if !self.tree.node(id)?.is_connection() {
            return Err(BrowserError::logic(format!("{} is not a connection", id)));
        }
        self.close_editors_under(id);
        self.tree.remove_node(id)?;
        info!("Removed connection {}", id);
        Ok(())
    }

    /// Replace a connection's settings. The node is re-keyed in place and
    /// reconnected; returns the new id.
    pub async fn update_connection(&mut self, id: &str, connection: Connection) -> Result<NodeId> {
        if !self.tree.node(id)?.is_connection() {
            return Err(BrowserError::logic(format!("{} is not a connection", id)));
        }
        let new_id = node::connection_id(&connection);
        if new_id.as_str() != id && self.tree.contains(new_id.as_str()) {
            return Err(BrowserError::Validation(new_id.to_string()));
        }
        let position = self
            .tree
            .children(ROOT_ID)
            .iter()
            .position(|child| child.as_str() == id)
            .unwrap_or(0);
        self.remove_connection(id)?;

        let node = Node::new(
            new_id,
            connection.server.clone(),
            connection.name.clone(),
            NodeKind::Connection(ConnectionNode {
                connection,
                db: None,
                security: None,
            }),
        );
        let new_id = self.tree.insert_node(ROOT_ID, position, node)?;
        self.tree.expand(new_id.as_str())?;
        if self.connect(new_id.as_str()).await? == LoadOutcome::Busy {
            warn!("Reconnect of {} skipped, node busy", new_id);
        }
        Ok(new_id)
    }

    fn check_new_name(&self, parent: &str, name: &str) -> Result<()> {
        if name_available(&self.child_names(parent), name) {
            Ok(())
        } else {
            Err(BrowserError::Validation(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TreeEvent;
    use crate::item::{Content, Item};
    use crate::store::StoreCall;
    use crate::testing::{id, loaded, CONN};
    use std::sync::{Arc, Mutex};

    fn ids(uris: &[&str]) -> Vec<NodeId> {
        uris.iter().map(|uri| NodeId::from(id(uri))).collect()
    }

    #[tokio::test]
    async fn test_move_document_between_collections() {
        let mut browser = loaded().await;
        let moved = browser
            .move_items(MoveOperation {
                source: ids(&["/db/a/doc.xml"]),
                destination: vec!["/db/b/doc.xml".to_string()],
                destination_container: NodeId::from(id("/db/b")),
                copy: false,
            })
            .await
            .unwrap();

        assert_eq!(moved, ids(&["/db/b/doc.xml"]));
        assert_eq!(
            browser.store().calls(),
            vec![StoreCall::Move {
                source: "/db/a/doc.xml".to_string(),
                destination: "/db/b/doc.xml".to_string(),
                is_collection: false,
                copy: false,
            }]
        );
        assert_eq!(browser.child_names(&id("/db/b")), vec!["doc.xml"]);
        assert_eq!(browser.child_names(&id("/db/a")), vec!["notes.txt"]);
        assert_eq!(browser.node(&id("/db/b/doc.xml")).unwrap().uri, "/db/b/doc.xml");
    }

    #[tokio::test]
    async fn test_copy_keeps_source() {
        let mut browser = loaded().await;
        let copied = browser
            .move_items(MoveOperation {
                source: ids(&["/db/a/notes.txt"]),
                destination: vec!["/db/b/notes.txt".to_string()],
                destination_container: NodeId::from(id("/db/b")),
                copy: true,
            })
            .await
            .unwrap();
        assert_eq!(copied.len(), 1);
        assert!(browser.tree().contains(&id("/db/a/notes.txt")));
        assert!(browser.tree().contains(&id("/db/b/notes.txt")));
    }

    #[tokio::test]
    async fn test_move_partial_failure_keeps_order() {
        let mut browser = loaded().await;
        browser.store().fail_on("/db/a/doc.xml");

        let moved = browser
            .move_items(MoveOperation {
                source: ids(&["/db/a/doc.xml", "/db/a/notes.txt", "/db/readme.txt"]),
                destination: vec![
                    "/db/b/doc.xml".to_string(),
                    "/db/b/notes.txt".to_string(),
                    "/db/b/readme.txt".to_string(),
                ],
                destination_container: NodeId::from(id("/db/b")),
                copy: false,
            })
            .await
            .unwrap();

        assert_eq!(moved, ids(&["/db/b/notes.txt", "/db/b/readme.txt"]));
        assert!(browser.tree().contains(&id("/db/a/doc.xml")));
        assert_eq!(browser.store().calls().len(), 3);
    }

    #[tokio::test]
    async fn test_move_length_mismatch_is_logic_error() {
        let mut browser = loaded().await;
        let err = browser
            .move_items(MoveOperation {
                source: ids(&["/db/a/doc.xml"]),
                destination: Vec::new(),
                destination_container: NodeId::from(id("/db/b")),
                copy: false,
            })
            .await
            .unwrap_err();
        assert!(err.is_logic());
        assert!(browser.store().calls().is_empty());
    }

    #[tokio::test]
    async fn test_move_collection_reloads_lazily() {
        let mut browser = loaded().await;
        let moved = browser
            .move_items(MoveOperation {
                source: ids(&["/db/a"]),
                destination: vec!["/db/b/a".to_string()],
                destination_container: NodeId::from(id("/db/b")),
                copy: false,
            })
            .await
            .unwrap();
        assert_eq!(moved, ids(&["/db/b/a"]));
        assert!(!browser.tree().contains(&id("/db/a/doc.xml")));

        browser.load(&id("/db/b/a")).await.unwrap();
        assert_eq!(browser.child_names(&id("/db/b/a")), vec!["doc.xml", "notes.txt"]);
    }

    #[tokio::test]
    async fn test_rename_selects_result() {
        let mut browser = loaded().await;
        let renamed = browser.rename(&id("/db/a/doc.xml"), "renamed.xml").await.unwrap();

        assert_eq!(renamed.as_str(), id("/db/a/renamed.xml"));
        assert_eq!(browser.selection(), &[renamed.clone()]);
        assert!(!browser.tree().contains(&id("/db/a/doc.xml")));
        assert!(browser.store().exists("/db/a/renamed.xml"));
    }

    #[tokio::test]
    async fn test_rename_validation_and_refusal() {
        let mut browser = loaded().await;
        let doc = id("/db/a/doc.xml");

        let taken = browser.rename(&doc, "notes.txt").await.unwrap_err();
        assert!(matches!(taken, BrowserError::Validation(_)));
        assert!(browser.store().calls().is_empty());

        browser.store().fail_on("/db/a/doc.xml");
        let refused = browser.rename(&doc, "other.xml").await.unwrap_err();
        assert!(matches!(refused, BrowserError::Rejected { operation: "rename", .. }));
        assert!(browser.tree().contains(&doc));
    }

    #[tokio::test]
    async fn test_rename_root_collection_is_logic_error() {
        let mut browser = loaded().await;
        let err = browser.rename(&id("/db"), "other").await.unwrap_err();
        assert!(err.is_logic());
    }

    #[tokio::test]
    async fn test_rename_moves_open_editor() {
        let mut browser = loaded().await;
        browser.open_document(&id("/db/a/doc.xml")).unwrap();
        let renamed = browser.rename(&id("/db/a/doc.xml"), "x.xml").await.unwrap();
        let editor = browser.editor(renamed.as_str()).unwrap();
        assert_eq!(editor.resource, format!("pebble:{}", renamed));
    }

    #[tokio::test]
    async fn test_delete_only_top_nodes() {
        let mut browser = loaded().await;
        browser.select(&id("/db/a")).unwrap();
        browser.add_to_selection(&id("/db/a/doc.xml")).unwrap();
        browser.add_to_selection(&id("/db/readme.txt")).unwrap();

        let mut prompted = DeletePrompt::default();
        let report = browser
            .delete_selection(|prompt| {
                prompted = prompt.clone();
                true
            })
            .await
            .unwrap();

        assert_eq!(prompted.collections, vec!["a"]);
        assert_eq!(prompted.documents, vec!["readme.txt"]);
        assert_eq!(report.deleted, ids(&["/db/a", "/db/readme.txt"]));
        assert!(report.failed.is_empty());
        assert_eq!(browser.store().calls().len(), 2);
        assert!(!browser.tree().contains(&id("/db/a/doc.xml")));
        assert!(!browser.store().exists("/db/a/doc.xml"));
        assert!(browser.selection().is_empty());
    }

    #[tokio::test]
    async fn test_delete_partial_failure() {
        let mut browser = loaded().await;
        browser.store().fail_on("/db/a/notes.txt");
        browser.select(&id("/db/a/doc.xml")).unwrap();
        browser.add_to_selection(&id("/db/a/notes.txt")).unwrap();

        let report = browser.delete_selection(|_| true).await.unwrap();
        assert_eq!(report.deleted, ids(&["/db/a/doc.xml"]));
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0.as_str(), id("/db/a/notes.txt"));

        let survivor = browser.node(&id("/db/a/notes.txt")).unwrap();
        assert!(!survivor.loading);
    }

    #[tokio::test]
    async fn test_delete_cancelled_reselects() {
        let mut browser = loaded().await;
        browser.select(&id("/db/readme.txt")).unwrap();
        let report = browser.delete_selection(|_| false).await.unwrap();

        assert!(report.cancelled);
        assert!(browser.store().calls().is_empty());
        assert_eq!(browser.selection(), ids(&["/db/readme.txt"]).as_slice());
    }

    #[tokio::test]
    async fn test_delete_closes_editors() {
        let mut browser = loaded().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = browser
            .events()
            .subscribe(move |event| sink.lock().unwrap().push(event));

        let doc = id("/db/a/doc.xml");
        let resource = browser.open_document(&doc).unwrap().unwrap();
        browser.select(&id("/db/a")).unwrap();
        browser.delete_selection(|_| true).await.unwrap();

        assert!(browser.editor(&doc).is_none());
        assert!(seen
            .lock()
            .unwrap()
            .contains(&TreeEvent::EditorClosed { uri: resource }));
    }

    #[tokio::test]
    async fn test_create_collection() {
        let mut browser = loaded().await;
        let created = browser.create_collection(&id("/db/b"), "c").await.unwrap();
        assert_eq!(created.as_str(), id("/db/b/c"));
        assert_eq!(
            browser.store().calls(),
            vec![StoreCall::NewCollection { uri: "/db/b/c".to_string() }]
        );

        let dup = browser.create_collection(&id("/db/b"), "c").await.unwrap_err();
        assert!(matches!(dup, BrowserError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_document_is_local_until_saved() {
        let mut browser = loaded().await;
        let name = browser.new_name(&id("/db/b"), Some("html"));
        assert_eq!(name, "untitled-1.html");

        let doc = browser.create_document(&id("/db/b"), &name, "<x/>").unwrap();
        let node = browser.node(doc.as_str()).unwrap();
        assert!(node.is_new());
        assert_eq!(node.document().unwrap().media_type, "text/html");
        assert!(browser.store().calls().is_empty());

        let editor = browser.editor(doc.as_str()).unwrap();
        assert!(editor.is_dirty());
        assert_eq!(editor.changes()[0].content, "<x/>");

        browser.save(doc.as_str(), Content::from("<x/>")).await.unwrap();
        assert!(!browser.node(doc.as_str()).unwrap().is_new());
        assert!(!browser.editor(doc.as_str()).unwrap().is_dirty());
        assert!(browser.store().exists("/db/b/untitled-1.html"));
    }

    #[tokio::test]
    async fn test_new_name_skips_taken() {
        let mut browser = loaded().await;
        browser.create_document(&id("/db/b"), "untitled-1", "").unwrap();
        browser.create_document(&id("/db/b"), "untitled-2", "").unwrap();
        assert_eq!(browser.new_name(&id("/db/b"), None), "untitled-3");
    }

    #[tokio::test]
    async fn test_create_from_template() {
        let mut browser = loaded().await;
        let params = BTreeMap::from([
            ("name".to_string(), "api".to_string()),
            ("prefix".to_string(), "demo".to_string()),
        ]);
        let doc = browser
            .create_from_template(&id("/db/b"), &Template::restxq(), &params)
            .unwrap();
        assert_eq!(doc.as_str(), id("/db/b/api.xqm"));
        let editor = browser.editor(doc.as_str()).unwrap();
        assert!(editor.changes()[0].content.contains("module namespace demo="));

        let missing = browser
            .create_from_template(&id("/db/b"), &Template::restxq(), &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(missing, BrowserError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_properties() {
        let mut browser = loaded().await;
        let updated = browser
            .update_properties(&id("/db/readme.txt"), "README", "guest", "guest")
            .await
            .unwrap();
        assert_eq!(updated.as_str(), id("/db/README"));

        let Some(Item::Document(stored)) = browser.store().item("/db/README") else {
            panic!("expected document")
        };
        assert_eq!(stored.owner, "guest");
        let item = browser.node(updated.as_str()).unwrap().item().unwrap();
        assert_eq!(item.group(), "guest");
    }

    #[tokio::test]
    async fn test_update_connection_rekeys_in_place() {
        let mut browser = loaded().await;
        let updated = browser
            .update_connection(CONN, Connection::new("local", "http://localhost:8080", "", ""))
            .await
            .unwrap();

        assert_eq!(updated.as_str(), "(guest)@http://localhost:8080");
        assert!(!browser.tree().contains(CONN));
        assert_eq!(browser.tree().children(ROOT_ID)[1], updated);
        assert!(browser.node(updated.as_str()).unwrap().loaded);
    }

    #[tokio::test]
    async fn test_update_connection_refuses_existing_id() {
        let mut browser = loaded().await;
        browser
            .add_connection(Connection::new("other", "http://other", "admin", ""), false)
            .unwrap();

        let err = browser
            .update_connection(CONN, Connection::new("local", "http://other", "admin", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::Validation(_)));
        assert!(browser.node(CONN).unwrap().loaded);
        assert!(browser.tree().contains(&id("/db/a/doc.xml")));
        assert_eq!(browser.tree().children(ROOT_ID)[1].as_str(), CONN);
    }

    #[tokio::test]
    async fn test_remove_connection() {
        let mut browser = loaded().await;
        browser.remove_connection(CONN).unwrap();
        assert!(!browser.tree().contains(&id("/db")));
        assert!(browser.remove_connection(ROOT_ID).unwrap_err().is_logic());
    }
}
