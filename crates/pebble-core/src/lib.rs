//! pebble-core: tree-sync and mutation engine for a remote document store.
//!
//! This crate provides:
//! - Path algebra over remote uris
//! - An id-keyed tree model with selection and a loading guard
//! - The `RemoteStore` trait and an in-memory implementation
//! - `Browser`, which loads, moves, renames, deletes and creates items
//!   through the store and keeps the tree in step

pub mod browser;
pub mod clipboard;
pub mod config;
pub mod editor;
pub mod events;
pub mod factory;
pub mod guard;
pub mod item;
pub mod loader;
pub mod mutation;
pub mod naming;
pub mod node;
pub mod path;
pub mod store;
pub mod template;
pub mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use browser::{Browser, BrowserError};
pub use clipboard::{Clipboard, can_move_to};
pub use config::BrowserSettings;
pub use editor::{ContentChange, EditorSession};
pub use events::{EventBus, Subscription, TreeEvent};
pub use item::{AclEntry, Collection, Connection, Content, Document, Item};
pub use loader::LoadOutcome;
pub use mutation::{DeletePrompt, DeleteReport, MoveOperation};
pub use node::{Node, NodeId, NodeKind};
pub use store::{FileSet, InMemoryStore, RemoteStore, StoreCall, StoreError, StoreSnapshot, UploadFile};
pub use template::Template;
pub use tree::{TreeError, TreeModel};
