//! Subcommands and the session that runs them against the engine.

use anyhow::{Context, Result, anyhow, bail};
use clap::Subcommand;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use pebble_core::node::{self, NodeKind};
use pebble_core::path::{SEPARATOR, leaf_name, parent_collection};
use pebble_core::{
    Browser, Content, InMemoryStore, LoadOutcome, MoveOperation, NodeId, StoreSnapshot, TreeModel,
    can_move_to,
};

use crate::config::Config;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the tree after connecting
    Tree,
    /// Create a collection
    Mkdir { uri: String },
    /// Create and save a document
    Touch {
        uri: String,
        /// Initial content
        #[arg(long, default_value = "")]
        content: String,
    },
    /// Move an item
    Mv { source: String, destination: String },
    /// Copy an item
    Cp { source: String, destination: String },
    /// Give an item a new name in its collection
    Rename { uri: String, name: String },
    /// Delete items
    Rm {
        #[arg(required = true)]
        uris: Vec<String>,
    },
    /// Upload local files into a collection
    Upload {
        collection: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List users of the connection
    Users,
    /// List groups of the connection
    Groups,
}

/// Read a store snapshot, or start from an empty store when `path` is
/// `None` or does not exist yet.
pub async fn load_store(path: Option<&Path>) -> Result<InMemoryStore> {
    let Some(path) = path else {
        return Ok(InMemoryStore::new());
    };
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        warn!("Fixture {:?} not found, starting empty", path);
        return Ok(InMemoryStore::new());
    }
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read fixture: {:?}", path))?;
    let snapshot: StoreSnapshot =
        serde_json::from_str(&text).with_context(|| format!("Failed to parse fixture: {:?}", path))?;
    debug!("Loaded {} items from {:?}", snapshot.items.len(), path);
    Ok(InMemoryStore::from_snapshot(snapshot))
}

pub async fn save_store(store: &InMemoryStore, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(&store.snapshot())?;
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("Failed to write fixture: {:?}", path))?;
    info!("Wrote store snapshot to {:?}", path);
    Ok(())
}

/// One connected browser.
pub struct Session {
    browser: Browser<InMemoryStore>,
    connection: NodeId,
}

impl Session {
    pub async fn open(store: InMemoryStore, config: &Config) -> Result<Self> {
        let mut browser = Browser::new(store);
        let connection = browser.add_connection(config.connection(), true)?;
        if browser.on_expanded(connection.as_str()).await? != LoadOutcome::Loaded {
            bail!("Connection {} did not load", connection);
        }
        Ok(Self { browser, connection })
    }

    pub fn browser(&self) -> &Browser<InMemoryStore> {
        &self.browser
    }

    /// Run `command` and return what should be printed.
    pub async fn run(&mut self, command: Command) -> Result<String> {
        match command {
            Command::Tree => {}
            Command::Mkdir { uri } => {
                let parent = self.reveal(&parent_collection(&uri)).await?;
                self.browser.create_collection(parent.as_str(), leaf_name(&uri)).await?;
            }
            Command::Touch { uri, content } => {
                let parent = self.reveal(&parent_collection(&uri)).await?;
                let id = self.browser.create_document(parent.as_str(), leaf_name(&uri), &content)?;
                self.browser.save(id.as_str(), Content::from(content)).await?;
            }
            Command::Mv { source, destination } => self.transfer(&source, &destination, false).await?,
            Command::Cp { source, destination } => self.transfer(&source, &destination, true).await?,
            Command::Rename { uri, name } => {
                let id = self.reveal(&uri).await?;
                self.browser.rename(id.as_str(), &name).await?;
            }
            Command::Rm { uris } => self.remove(&uris).await?,
            Command::Upload { collection, files } => self.upload(&collection, &files).await?,
            Command::Users => return Ok(self.connection()?.users.join("\n")),
            Command::Groups => return Ok(self.connection()?.groups.join("\n")),
        }
        Ok(render_tree(self.browser.tree()))
    }

    fn connection(&self) -> Result<&pebble_core::Connection> {
        self.browser
            .tree()
            .connection_of(self.connection.as_str())
            .ok_or_else(|| anyhow!("Connection {} is gone", self.connection))
    }

    /// Expand every collection from the root down to `uri` and return the
    /// node id of `uri`.
    async fn reveal(&mut self, uri: &str) -> Result<NodeId> {
        let connection = self.connection()?.clone();
        let mut prefix = String::new();
        let mut id = None;

        for segment in uri.split(SEPARATOR).filter(|segment| !segment.is_empty()) {
            prefix.push(SEPARATOR);
            prefix.push_str(segment);
            let next = node::item_id(&connection, &prefix);
            if !self.browser.tree().contains(next.as_str()) {
                bail!("No such item: {}", prefix);
            }
            if self.browser.node(next.as_str())?.is_collection() {
                self.browser.expand(next.as_str()).await?;
            }
            id = Some(next);
        }

        id.ok_or_else(|| anyhow!("Not an item uri: {:?}", uri))
    }

    async fn transfer(&mut self, source: &str, destination: &str, copy: bool) -> Result<()> {
        if !can_move_to(&[source], destination) {
            bail!("Cannot move {} into itself", source);
        }
        let source_id = self.reveal(source).await?;
        let container = self.reveal(&parent_collection(destination)).await?;
        let moved = self
            .browser
            .move_items(MoveOperation {
                source: vec![source_id],
                destination: vec![destination.to_string()],
                destination_container: container,
                copy,
            })
            .await?;
        if moved.is_empty() {
            bail!("Server refused to {} {} to {}", if copy { "copy" } else { "move" }, source, destination);
        }
        Ok(())
    }

    async fn remove(&mut self, uris: &[String]) -> Result<()> {
        self.browser.tree_mut().clear_selection();
        for uri in uris {
            let id = self.reveal(uri).await?;
            self.browser.add_to_selection(id.as_str())?;
        }

        let report = self
            .browser
            .delete_selection(|prompt| {
                info!(
                    "Deleting collections {:?} and documents {:?}",
                    prompt.collections, prompt.documents
                );
                true
            })
            .await?;
        if !report.failed.is_empty() {
            let failed: Vec<String> = report
                .failed
                .iter()
                .map(|(id, reason)| format!("{}: {}", id, reason))
                .collect();
            bail!("Failed to delete {}", failed.join(", "));
        }
        Ok(())
    }

    async fn upload(&mut self, collection: &str, files: &[PathBuf]) -> Result<()> {
        let target = self.reveal(collection).await?;
        let mut contents = BTreeMap::new();
        for file in files {
            let path = std::path::absolute(file)
                .with_context(|| format!("Failed to resolve {:?}", file))?;
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {:?}", path))?;
            contents.insert(path.to_string_lossy().replace('\\', "/"), bytes);
        }
        let saved = self.browser.upload(target.as_str(), contents).await?;
        info!("Uploaded {} files to {}", saved.len(), collection);
        Ok(())
    }
}

/// Indented listing of the tree, collections marked with a trailing `/`.
pub fn render_tree(tree: &TreeModel) -> String {
    let mut out = String::new();
    for (depth, node) in tree.walk() {
        let label = match &node.kind {
            NodeKind::Toolbar => continue,
            NodeKind::Connection(payload) => format!("{} ({})", node.name, payload.connection.server),
            _ if node.is_composite() => format!("{}/", node.name),
            _ => node.name.clone(),
        };
        out.push_str(&"  ".repeat(depth));
        out.push_str(&label);
        out.push('\n');
    }
    out
}
