//! Connecting, lazy loading, documents and uploads.

use chrono::Utc;
use std::collections::BTreeMap;
use std::mem;
use tracing::{debug, error, info, warn};

use crate::browser::{Browser, BrowserError, Result};
use crate::editor::EditorSession;
use crate::events::TreeEvent;
use crate::item::{Content, Document, Item, media_type_for};
use crate::node::NodeKind;
use crate::path::{clean_file_map, top_dir};
use crate::store::{FileSet, RemoteStore, StoreError, UploadFile};

/// What a load request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Children were fetched and inserted.
    Loaded,
    /// Nothing to do, the node already holds its children.
    AlreadyLoaded,
    /// The node or an item ancestor is loading; the request was dropped.
    Busy,
}

impl<S: RemoteStore> Browser<S> {
    /// Open a session for a connection node and populate its root
    /// collection and security subtree.
    pub async fn connect(&mut self, id: &str) -> Result<LoadOutcome> {
        if !self.tree.node(id)?.is_connection() {
            return Err(BrowserError::logic(format!("{} is not a connection", id)));
        }
        if !self.tree.start_loading(id) {
            return Ok(LoadOutcome::Busy);
        }

        let result = self.connect_inner(id).await;
        self.tree.end_loading(id);
        match result {
            Ok(()) => {
                info!("Connected {}", id);
                Ok(LoadOutcome::Loaded)
            }
            Err(e) => {
                error!("Failed to connect {}: {}", id, e);
                self.tree.empty(id)?;
                if let Some(NodeKind::Connection(payload)) = self.tree.get_mut(id).map(|node| &mut node.kind) {
                    payload.db = None;
                    payload.security = None;
                }
                self.tree.set_loaded(id, false)?;
                self.tree.collapse(id)?;
                Err(e)
            }
        }
    }

    async fn connect_inner(&mut self, id: &str) -> Result<()> {
        let connection = self.connection_for(id)?;
        let mut root = self.store.connect(&connection).await?;
        let collections = mem::take(&mut root.collections);
        let documents = mem::take(&mut root.documents);

        let db = self.add_collection(id, root)?;
        if let Some(NodeKind::Connection(payload)) = self.tree.get_mut(id).map(|node| &mut node.kind) {
            payload.db = Some(db.clone());
        }

        self.insert_listing(db.as_str(), collections, documents)?;
        self.tree.set_loaded(db.as_str(), true)?;
        self.tree.expand(db.as_str())?;

        self.add_security(id).await?;
        self.tree.set_loaded(id, true)?;
        Ok(())
    }

    /// Fetch the children of a collection node.
    ///
    /// A loaded node is left alone and the store is not called.
    pub async fn load(&mut self, id: &str) -> Result<LoadOutcome> {
        let (id, uri) = self.collection_node(id)?;
        if self.tree.node(id.as_str())?.loaded {
            debug!("{} already loaded", id);
            return Ok(LoadOutcome::AlreadyLoaded);
        }
        if !self.tree.start_loading(id.as_str()) {
            return Ok(LoadOutcome::Busy);
        }

        let result = self.load_inner(id.as_str(), &uri).await;
        self.tree.end_loading(id.as_str());
        match result {
            Ok(()) => Ok(LoadOutcome::Loaded),
            Err(e) => {
                error!("Failed to load {}: {}", uri, e);
                self.tree.collapse(id.as_str())?;
                Err(e)
            }
        }
    }

    async fn load_inner(&mut self, id: &str, uri: &str) -> Result<()> {
        let connection = self.connection_for(id)?;
        let Item::Collection(mut listing) = self.store.load(&connection, uri).await? else {
            return Err(StoreError::Other(format!("{} is no longer a collection", uri)).into());
        };
        let collections = mem::take(&mut listing.collections);
        let documents = mem::take(&mut listing.documents);
        self.insert_listing(id, collections, documents)?;

        listing.name = uri.to_string();
        if let Some(NodeKind::Item(node)) = self.tree.get_mut(id).map(|node| &mut node.kind) {
            node.item = Item::Collection(listing);
        }
        self.tree.set_loaded(id, true)?;
        Ok(())
    }

    /// Hook for a node the view just expanded: connect or load it when it
    /// has not been populated yet.
    pub async fn on_expanded(&mut self, id: &str) -> Result<LoadOutcome> {
        let node = self.tree.node(id)?;
        if node.loaded {
            return Ok(LoadOutcome::AlreadyLoaded);
        }
        if node.is_connection() {
            self.connect(id).await
        } else if node.is_collection() {
            self.load(id).await
        } else {
            Ok(LoadOutcome::AlreadyLoaded)
        }
    }

    /// Expand `id` and populate it lazily.
    pub async fn expand(&mut self, id: &str) -> Result<LoadOutcome> {
        self.tree.expand(id)?;
        self.on_expanded(id).await
    }

    /// Drop the children of a connection or collection and fetch them again.
    /// Other nodes only trigger a repaint.
    pub async fn refresh(&mut self, id: &str) -> Result<LoadOutcome> {
        let node = self.tree.node(id)?;
        if !node.is_connection() && !node.is_collection() {
            self.tree.refresh();
            return Ok(LoadOutcome::AlreadyLoaded);
        }
        if self.tree.is_loading(id) {
            return Ok(LoadOutcome::Busy);
        }

        for child in self.tree.children(id).to_vec() {
            self.close_editors_under(child.as_str());
        }
        self.tree.empty(id)?;
        self.tree.set_loaded(id, false)?;
        self.expand(id).await
    }

    /// Open an editor session on a document node and ask the host to show
    /// it. Returns the resource uri, or `None` while the node is busy.
    pub fn open_document(&mut self, id: &str) -> Result<Option<String>> {
        let node = self.tree.node(id)?;
        if !node.is_document() {
            return Err(BrowserError::logic(format!("{} is not a document", id)));
        }
        let id = node.id.clone();
        if !self.tree.start_loading(id.as_str()) {
            return Ok(None);
        }

        let resource = self.resource_uri(id.as_str());
        self.editors
            .entry(id.clone())
            .or_insert_with(|| EditorSession::new(resource.clone()));
        self.tree.events().emit(TreeEvent::OpenResource {
            uri: resource.clone(),
        });
        self.tree.end_loading(id.as_str());
        self.tree.set_loaded(id.as_str(), true)?;
        Ok(Some(resource))
    }

    /// Write `content` to the document behind `id`. A successful save
    /// clears the new flag and the editor's dirty state.
    pub async fn save(&mut self, id: &str, content: Content) -> Result<()> {
        let node = self.tree.node(id)?;
        if !node.is_document() {
            return Err(BrowserError::logic(format!("{} is not a document", id)));
        }
        let (id, uri) = (node.id.clone(), node.uri.clone());
        let connection = self.connection_for(id.as_str())?;

        let saved = self
            .store
            .save(&connection, &uri, &content)
            .await
            .inspect_err(|e| error!("Failed to save {}: {}", uri, e))?;
        if !saved {
            return Err(BrowserError::Rejected { operation: "save", uri });
        }

        if let Some(NodeKind::Item(node)) = self.tree.get_mut(id.as_str()).map(|node| &mut node.kind) {
            node.is_new = false;
            if let Item::Document(document) = &mut node.item {
                document.size = content.len() as u64;
                document.binary_doc = content.is_binary();
                document.last_modified = Utc::now();
            }
        }
        if let Some(editor) = self.editors.get_mut(&id) {
            editor.mark_saved();
        }
        self.tree.touch(id.as_str());
        info!("Saved {}", uri);
        Ok(())
    }

    /// Store a batch of files below the collection `id` and add the results
    /// to the tree. Names may contain separators; missing collections are
    /// created.
    pub async fn save_documents(&mut self, id: &str, files: FileSet) -> Result<Vec<Document>> {
        let (id, uri) = self.collection_node(id)?;
        if !self.tree.start_loading(id.as_str()) {
            return Err(BrowserError::Busy(id.to_string()));
        }
        let result = self.save_documents_inner(id.as_str(), &uri, &files).await;
        self.tree.end_loading(id.as_str());
        if let Err(e) = &result {
            error!("Failed to upload {} files to {}: {}", files.len(), uri, e);
        }
        result
    }

    async fn save_documents_inner(&mut self, id: &str, uri: &str, files: &FileSet) -> Result<Vec<Document>> {
        let connection = self.connection_for(id)?;
        let saved = self.store.save_documents(&connection, uri, files).await?;
        let connection_node = self
            .tree
            .connection_node_of(id)
            .map(|node| node.id.clone())
            .ok_or_else(|| BrowserError::logic(format!("{} has no connection", id)))?;

        for document in &saved {
            self.add_document_recursive(connection_node.as_str(), document.clone(), false)?;
        }
        info!("Uploaded {} files to {}", saved.len(), uri);
        Ok(saved)
    }

    /// Upload local files to the collection `id`.
    ///
    /// The keys are local paths; their shared root is stripped so the
    /// relative layout is recreated below the collection.
    pub async fn upload(&mut self, id: &str, files: BTreeMap<String, Vec<u8>>) -> Result<Vec<Document>> {
        if files.is_empty() {
            warn!("Nothing to upload to {}", id);
            return Ok(Vec::new());
        }
        let top = top_dir(&files.keys().collect::<Vec<_>>());
        let set: FileSet = clean_file_map(files, Some(top.as_str()))
            .into_iter()
            .map(|(name, bytes)| {
                let content = match String::from_utf8(bytes) {
                    Ok(text) => Content::Text(text),
                    Err(e) => Content::Binary(e.into_bytes()),
                };
                let fallback = if content.is_binary() {
                    "application/octet-stream"
                } else {
                    self.settings.default_media_type.as_str()
                };
                let media_type = media_type_for(&name, fallback);
                (name, UploadFile { content, media_type })
            })
            .collect();
        self.save_documents(id, set).await
    }
}
