//! Remote records: connections, collections and documents.
//!
//! These are the shapes the store hands back. A record's `name` is its full
//! uri; the tree keeps the leaf segment separately on the node.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credentials and endpoint for one remote store session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Display name
    pub name: String,
    /// Server base url
    pub server: String,
    /// Empty for guest sessions
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    /// Users discovered on connect
    #[serde(default)]
    pub users: Vec<String>,
    /// Groups discovered on connect
    #[serde(default)]
    pub groups: Vec<String>,
}

impl Connection {
    pub fn new(
        name: impl Into<String>,
        server: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            server: server.into(),
            username: username.into(),
            password: password.into(),
            users: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.username.is_empty()
    }
}

/// One access control entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclEntry {
    /// `USER` or `GROUP`
    pub target: String,
    pub who: String,
    /// `ALLOWED` or `DENIED`
    pub access: String,
    /// Unix style mode string, e.g. `rwx`
    pub mode: String,
}

/// Document payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Binary(Vec<u8>),
}

impl Content {
    pub fn len(&self) -> usize {
        match self {
            Content::Text(text) => text.len(),
            Content::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Content::Binary(_))
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Binary(bytes)
    }
}

/// A directory-like container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// Full uri
    pub name: String,
    pub created: DateTime<Utc>,
    pub owner: String,
    pub group: String,
    #[serde(default)]
    pub acl: Vec<AclEntry>,
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl Collection {
    /// Empty collection record, used for placeholders and fresh creations.
    pub fn new(name: impl Into<String>, owner: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: Utc::now(),
            owner: owner.into(),
            group: group.into(),
            acl: Vec::new(),
            collections: Vec::new(),
            documents: Vec::new(),
        }
    }
}

/// A leaf resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full uri
    pub name: String,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub owner: String,
    pub group: String,
    #[serde(default)]
    pub acl: Vec<AclEntry>,
    pub media_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub binary_doc: bool,
    /// Only present when the document was loaded individually
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
}

impl Document {
    pub fn new(name: impl Into<String>, owner: impl Into<String>, group: impl Into<String>) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            media_type: media_type_for(&name, "text/plain"),
            name,
            created: now,
            last_modified: now,
            owner: owner.into(),
            group: group.into(),
            acl: Vec::new(),
            size: 0,
            binary_doc: false,
            content: None,
        }
    }

    /// Attach a payload, updating size and the binary flag.
    pub fn with_content(mut self, content: Content) -> Self {
        self.size = content.len() as u64;
        self.binary_doc = content.is_binary();
        self.content = Some(content);
        self
    }
}

/// Guess a media type from the file extension of `name`.
pub fn media_type_for(name: &str, fallback: &str) -> String {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or(fallback)
        .to_string()
}

/// Either kind of path-addressed resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Item {
    Collection(Collection),
    Document(Document),
}

impl Item {
    pub fn name(&self) -> &str {
        match self {
            Item::Collection(collection) => &collection.name,
            Item::Document(document) => &document.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        match self {
            Item::Collection(collection) => collection.name = name.into(),
            Item::Document(document) => document.name = name.into(),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Item::Collection(_))
    }

    pub fn owner(&self) -> &str {
        match self {
            Item::Collection(collection) => &collection.owner,
            Item::Document(document) => &document.owner,
        }
    }

    pub fn group(&self) -> &str {
        match self {
            Item::Collection(collection) => &collection.group,
            Item::Document(document) => &document.group,
        }
    }

    pub fn set_ownership(&mut self, owner: impl Into<String>, group: impl Into<String>) {
        match self {
            Item::Collection(collection) => {
                collection.owner = owner.into();
                collection.group = group.into();
            }
            Item::Document(document) => {
                document.owner = owner.into();
                document.group = group.into();
            }
        }
    }
}

impl From<Collection> for Item {
    fn from(collection: Collection) -> Self {
        Item::Collection(collection)
    }
}

impl From<Document> for Item {
    fn from(document: Document) -> Self {
        Item::Document(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_guess() {
        assert_eq!(media_type_for("/db/index.html", "text/plain"), "text/html");
        assert_eq!(media_type_for("/db/noext", "text/plain"), "text/plain");
    }

    #[test]
    fn test_document_with_content() {
        let doc = Document::new("/db/a.bin", "admin", "dba").with_content(vec![1u8, 2, 3].into());
        assert_eq!(doc.size, 3);
        assert!(doc.binary_doc);
    }

    #[test]
    fn test_item_serde_tagging() {
        let item = Item::from(Collection::new("/db/apps", "admin", "dba"));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "collection");
        assert_eq!(json["name"], "/db/apps");

        let back: Item = serde_json::from_value(json).unwrap();
        assert!(back.is_collection());
    }

    #[test]
    fn test_connection_password_not_serialized() {
        let connection = Connection::new("local", "http://localhost:8080", "admin", "secret");
        let json = serde_json::to_string(&connection).unwrap();
        assert!(!json.contains("secret"));
    }
}
