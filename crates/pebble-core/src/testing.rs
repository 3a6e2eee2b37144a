//! Shared fixtures for engine tests.

use crate::browser::Browser;
use crate::item::Connection;
use crate::store::InMemoryStore;

pub const CONN: &str = "admin@http://localhost:8080";

/// Node id of `uri` on the fixture connection.
pub fn id(uri: &str) -> String {
    format!("{}{}", CONN, uri)
}

/// `/db` with two collections holding a few documents.
pub fn store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.add_document("/db/a/doc.xml", "<doc/>");
    store.add_document("/db/a/notes.txt", "notes");
    store.add_collection("/db/b");
    store.add_document("/db/readme.txt", "hello");
    store
}

pub fn browser() -> Browser<InMemoryStore> {
    let mut browser = Browser::new(store());
    browser
        .add_connection(Connection::new("local", "http://localhost:8080", "admin", ""), false)
        .unwrap();
    browser
}

/// Connected browser with `/db/a` and `/db/b` loaded and no recorded calls.
pub async fn loaded() -> Browser<InMemoryStore> {
    let mut browser = browser();
    browser.connect(CONN).await.unwrap();
    browser.load(&id("/db/a")).await.unwrap();
    browser.load(&id("/db/b")).await.unwrap();
    browser.store().clear_calls();
    browser
}
