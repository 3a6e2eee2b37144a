//! RemoteStore trait abstraction for the document server.
//!
//! Implementations:
//! - `InMemoryStore` - For testing and the CLI; records every call
//! - An HTTP adapter in the host application talks to the real server
//!
//! The engine only ever sees this trait. All operations are asynchronous and
//! report failure as `StoreError`; a `false` return means the server answered
//! but declined the change.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use crate::item::{Collection, Connection, Content, Document, Item};
use crate::path::{collection_dir, is_within, parent_collection};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Store error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Top-level listing returned on connect: the root collection with its
/// direct children.
pub type RootListing = Collection;

/// One file of an upload batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub content: Content,
    pub media_type: String,
}

/// Upload batch keyed by path relative to the target collection.
pub type FileSet = BTreeMap<String, UploadFile>;

/// Remote document store as seen by the engine.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Open a session and list the root collection.
    async fn connect(&self, connection: &Connection) -> Result<RootListing>;

    /// Load a collection (with direct children) or a document (with content).
    async fn load(&self, connection: &Connection, uri: &str) -> Result<Item>;

    /// Store a document's content.
    async fn save(&self, connection: &Connection, uri: &str, content: &Content) -> Result<bool>;

    /// Store a batch of files below `collection`, creating sub-collections.
    async fn save_documents(
        &self,
        connection: &Connection,
        collection: &str,
        files: &FileSet,
    ) -> Result<Vec<Document>>;

    /// Move or copy a resource.
    async fn move_item(
        &self,
        connection: &Connection,
        source: &str,
        destination: &str,
        is_collection: bool,
        copy: bool,
    ) -> Result<bool>;

    /// Delete a resource and everything below it.
    async fn remove(&self, connection: &Connection, uri: &str, is_collection: bool) -> Result<bool>;

    /// Create an empty collection.
    async fn new_collection(&self, connection: &Connection, uri: &str) -> Result<Collection>;

    /// Change owner and group of a resource.
    async fn chmod(
        &self,
        connection: &Connection,
        uri: &str,
        owner: &str,
        group: &str,
        is_collection: bool,
    ) -> Result<bool>;

    async fn get_users(&self, connection: &Connection) -> Result<Vec<String>>;

    async fn get_groups(&self, connection: &Connection) -> Result<Vec<String>>;
}

/// A call received by [`InMemoryStore`], for assertions in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Connect { server: String },
    Load { uri: String },
    Save { uri: String },
    SaveDocuments { collection: String, names: Vec<String> },
    Move { source: String, destination: String, is_collection: bool, copy: bool },
    Remove { uri: String, is_collection: bool },
    NewCollection { uri: String },
    Chmod { uri: String, owner: String, group: String },
    GetUsers,
    GetGroups,
}

/// Serializable contents of an [`InMemoryStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub root: String,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    /// username -> password; empty accepts any credentials
    #[serde(default)]
    pub accounts: BTreeMap<String, String>,
    #[serde(default)]
    pub items: Vec<Item>,
}

struct StoreState {
    root: String,
    users: Vec<String>,
    groups: Vec<String>,
    accounts: BTreeMap<String, String>,
    /// Flat records keyed by uri, nested lists always empty
    items: BTreeMap<String, Item>,
}

/// In-memory store for testing
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    calls: Mutex<Vec<StoreCall>>,
    failing: RwLock<HashSet<String>>,
    offline: AtomicBool,
}

const DEFAULT_GROUP: &str = "dba";
const SYSTEM_OWNER: &str = "SYSTEM";

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Store holding an empty `/db` root, users `admin`/`guest` and groups
    /// `dba`/`guest`.
    pub fn new() -> Self {
        Self::from_snapshot(StoreSnapshot {
            root: "/db".to_string(),
            users: vec!["admin".to_string(), "guest".to_string()],
            groups: vec![DEFAULT_GROUP.to_string(), "guest".to_string()],
            accounts: BTreeMap::new(),
            items: Vec::new(),
        })
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut items = BTreeMap::new();
        items.insert(
            snapshot.root.clone(),
            Item::Collection(Collection::new(&snapshot.root, SYSTEM_OWNER, DEFAULT_GROUP)),
        );
        let store = Self {
            state: RwLock::new(StoreState {
                root: snapshot.root,
                users: snapshot.users,
                groups: snapshot.groups,
                accounts: snapshot.accounts,
                items,
            }),
            calls: Mutex::new(Vec::new()),
            failing: RwLock::new(HashSet::new()),
            offline: AtomicBool::new(false),
        };
        for item in snapshot.items {
            store.insert(item);
        }
        store
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.read();
        StoreSnapshot {
            root: state.root.clone(),
            users: state.users.clone(),
            groups: state.groups.clone(),
            accounts: state.accounts.clone(),
            items: state
                .items
                .iter()
                .filter(|(uri, _)| **uri != state.root)
                .map(|(_, item)| item.clone())
                .collect(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a record, creating missing parent collections.
    fn insert(&self, mut item: Item) {
        let mut state = self.write();
        Self::ensure_parents(&mut state, item.name());
        if let Item::Collection(collection) = &mut item {
            collection.collections.clear();
            collection.documents.clear();
        }
        state.items.insert(item.name().to_string(), item);
    }

    fn ensure_parents(state: &mut StoreState, uri: &str) {
        let mut missing = Vec::new();
        let mut parent = parent_collection(uri);
        while !parent.is_empty() && !state.items.contains_key(&parent) {
            missing.push(parent.clone());
            parent = parent_collection(&parent);
        }
        for uri in missing.into_iter().rev() {
            let collection = Collection::new(&uri, SYSTEM_OWNER, DEFAULT_GROUP);
            state.items.insert(uri, Item::Collection(collection));
        }
    }

    pub fn add_collection(&self, uri: &str) {
        self.insert(Item::Collection(Collection::new(uri, SYSTEM_OWNER, DEFAULT_GROUP)));
    }

    pub fn add_document(&self, uri: &str, content: impl Into<Content>) {
        let document = Document::new(uri, SYSTEM_OWNER, DEFAULT_GROUP).with_content(content.into());
        self.insert(Item::Document(document));
    }

    /// Require these credentials on every call.
    pub fn set_account(&self, username: &str, password: &str) {
        self.write()
            .accounts
            .insert(username.to_string(), password.to_string());
    }

    /// Simulate an unreachable server.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make every call that touches `uri` fail.
    pub fn fail_on(&self, uri: &str) {
        self.failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(uri.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn exists(&self, uri: &str) -> bool {
        self.read().items.contains_key(uri)
    }

    pub fn item(&self, uri: &str) -> Option<Item> {
        self.read().items.get(uri).cloned()
    }

    /// Every stored uri in lexical order.
    pub fn uris(&self) -> Vec<String> {
        self.read().items.keys().cloned().collect()
    }

    fn record(&self, call: StoreCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    fn authenticate(&self, connection: &Connection) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable(connection.server.clone()));
        }
        let state = self.read();
        if state.accounts.is_empty() {
            return Ok(());
        }
        match state.accounts.get(&connection.username) {
            Some(password) if *password == connection.password => Ok(()),
            _ => Err(StoreError::Unauthorized(connection.username.clone())),
        }
    }

    fn check_failure(&self, uri: &str) -> Result<()> {
        let failing = self.failing.read().unwrap_or_else(|e| e.into_inner());
        if failing.contains(uri) {
            return Err(StoreError::Rejected(format!("Injected failure: {}", uri)));
        }
        Ok(())
    }

    fn owner_for(connection: &Connection) -> String {
        if connection.is_guest() {
            "guest".to_string()
        } else {
            connection.username.clone()
        }
    }

    /// Collection record with its direct children filled in.
    fn listing(state: &StoreState, uri: &str) -> Result<Collection> {
        let mut collection = match state.items.get(uri) {
            Some(Item::Collection(collection)) => collection.clone(),
            _ => return Err(StoreError::NotFound(uri.to_string())),
        };
        for (key, item) in &state.items {
            if key == uri || parent_collection(key) != uri {
                continue;
            }
            match item {
                Item::Collection(child) => collection.collections.push(child.clone()),
                Item::Document(child) => {
                    let mut child = child.clone();
                    child.content = None;
                    collection.documents.push(child);
                }
            }
        }
        Ok(collection)
    }

    fn require_collection(state: &StoreState, uri: &str) -> Result<()> {
        match state.items.get(uri) {
            Some(Item::Collection(_)) => Ok(()),
            _ => Err(StoreError::NotFound(uri.to_string())),
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn connect(&self, connection: &Connection) -> Result<RootListing> {
        self.record(StoreCall::Connect {
            server: connection.server.clone(),
        });
        self.authenticate(connection)?;
        let state = self.read();
        Self::listing(&state, &state.root)
    }

    async fn load(&self, connection: &Connection, uri: &str) -> Result<Item> {
        self.record(StoreCall::Load { uri: uri.to_string() });
        self.authenticate(connection)?;
        self.check_failure(uri)?;
        let state = self.read();
        match state.items.get(uri) {
            Some(Item::Collection(_)) => Ok(Item::Collection(Self::listing(&state, uri)?)),
            Some(Item::Document(document)) => Ok(Item::Document(document.clone())),
            None => Err(StoreError::NotFound(uri.to_string())),
        }
    }

    async fn save(&self, connection: &Connection, uri: &str, content: &Content) -> Result<bool> {
        self.record(StoreCall::Save { uri: uri.to_string() });
        self.authenticate(connection)?;
        self.check_failure(uri)?;
        let mut state = self.write();
        if let Some(Item::Collection(_)) = state.items.get(uri) {
            return Err(StoreError::AlreadyExists(uri.to_string()));
        }
        Self::ensure_parents(&mut state, uri);
        let document = match state.items.remove(uri) {
            Some(Item::Document(mut existing)) => {
                existing.last_modified = Utc::now();
                existing.with_content(content.clone())
            }
            _ => Document::new(uri, Self::owner_for(connection), DEFAULT_GROUP)
                .with_content(content.clone()),
        };
        state.items.insert(uri.to_string(), Item::Document(document));
        Ok(true)
    }

    async fn save_documents(
        &self,
        connection: &Connection,
        collection: &str,
        files: &FileSet,
    ) -> Result<Vec<Document>> {
        self.record(StoreCall::SaveDocuments {
            collection: collection.to_string(),
            names: files.keys().cloned().collect(),
        });
        self.authenticate(connection)?;
        self.check_failure(collection)?;
        let mut state = self.write();
        Self::require_collection(&state, collection)?;

        let mut saved = Vec::new();
        for (name, file) in files {
            let uri = collection_dir(collection, name);
            Self::ensure_parents(&mut state, &uri);
            let mut document = Document::new(&uri, Self::owner_for(connection), DEFAULT_GROUP)
                .with_content(file.content.clone());
            document.media_type = file.media_type.clone();

            let mut listed = document.clone();
            listed.content = None;
            saved.push(listed);
            state.items.insert(uri, Item::Document(document));
        }
        Ok(saved)
    }

    async fn move_item(
        &self,
        connection: &Connection,
        source: &str,
        destination: &str,
        is_collection: bool,
        copy: bool,
    ) -> Result<bool> {
        self.record(StoreCall::Move {
            source: source.to_string(),
            destination: destination.to_string(),
            is_collection,
            copy,
        });
        self.authenticate(connection)?;
        self.check_failure(source)?;
        self.check_failure(destination)?;

        let mut state = self.write();
        match state.items.get(source) {
            Some(item) if item.is_collection() == is_collection => {}
            _ => return Err(StoreError::NotFound(source.to_string())),
        }
        if state.items.contains_key(destination) {
            return Err(StoreError::AlreadyExists(destination.to_string()));
        }
        if is_within(destination, source) {
            return Err(StoreError::Rejected(format!(
                "Cannot move {} into itself",
                source
            )));
        }
        Self::require_collection(&state, &parent_collection(destination))?;

        let moved: Vec<(String, Item)> = state
            .items
            .iter()
            .filter(|(uri, _)| is_within(uri, source))
            .map(|(uri, item)| (uri.clone(), item.clone()))
            .collect();

        for (uri, mut item) in moved {
            let target = format!("{}{}", destination, &uri[source.len()..]);
            item.set_name(target.clone());
            if !copy {
                state.items.remove(&uri);
            }
            state.items.insert(target, item);
        }
        Ok(true)
    }

    async fn remove(&self, connection: &Connection, uri: &str, is_collection: bool) -> Result<bool> {
        self.record(StoreCall::Remove {
            uri: uri.to_string(),
            is_collection,
        });
        self.authenticate(connection)?;
        self.check_failure(uri)?;

        let mut state = self.write();
        match state.items.get(uri) {
            Some(item) if item.is_collection() == is_collection => {}
            _ => return Err(StoreError::NotFound(uri.to_string())),
        }
        if uri == state.root {
            return Ok(false);
        }
        state.items.retain(|key, _| !is_within(key, uri));
        Ok(true)
    }

    async fn new_collection(&self, connection: &Connection, uri: &str) -> Result<Collection> {
        self.record(StoreCall::NewCollection { uri: uri.to_string() });
        self.authenticate(connection)?;
        self.check_failure(uri)?;

        let mut state = self.write();
        if state.items.contains_key(uri) {
            return Err(StoreError::AlreadyExists(uri.to_string()));
        }
        Self::require_collection(&state, &parent_collection(uri))?;
        let collection = Collection::new(uri, Self::owner_for(connection), DEFAULT_GROUP);
        state
            .items
            .insert(uri.to_string(), Item::Collection(collection.clone()));
        Ok(collection)
    }

    async fn chmod(
        &self,
        connection: &Connection,
        uri: &str,
        owner: &str,
        group: &str,
        is_collection: bool,
    ) -> Result<bool> {
        self.record(StoreCall::Chmod {
            uri: uri.to_string(),
            owner: owner.to_string(),
            group: group.to_string(),
        });
        self.authenticate(connection)?;
        self.check_failure(uri)?;

        let mut state = self.write();
        match state.items.get_mut(uri) {
            Some(item) if item.is_collection() == is_collection => {
                item.set_ownership(owner, group);
                Ok(true)
            }
            _ => Err(StoreError::NotFound(uri.to_string())),
        }
    }

    async fn get_users(&self, connection: &Connection) -> Result<Vec<String>> {
        self.record(StoreCall::GetUsers);
        self.authenticate(connection)?;
        self.check_failure("/users")?;
        Ok(self.read().users.clone())
    }

    async fn get_groups(&self, connection: &Connection) -> Result<Vec<String>> {
        self.record(StoreCall::GetGroups);
        self.authenticate(connection)?;
        self.check_failure("/groups")?;
        Ok(self.read().groups.clone())
    }
}
