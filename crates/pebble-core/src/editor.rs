//! Editor sessions opened on documents.
//!
//! The host editor owns the text buffer; the engine only tracks which
//! documents are open, the edits it pushed, and whether they are saved.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// One edit applied to the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentChange {
    pub range: Range,
    pub range_length: usize,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSession {
    /// Scheme-qualified resource uri the editor was opened on
    pub resource: String,
    dirty: bool,
    changes: Vec<ContentChange>,
}

impl EditorSession {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            dirty: false,
            changes: Vec::new(),
        }
    }

    /// Fill an empty buffer with `content` as a single edit at 0:0.
    pub fn seed(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        self.changes.push(ContentChange {
            range: Range::default(),
            range_length: 0,
            content: content.to_string(),
        });
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn changes(&self) -> &[ContentChange] {
        &self.changes
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
        self.changes.clear();
    }
}
