//! Engine settings.

use serde::{Deserialize, Serialize};

/// Tunables for a [`Browser`](crate::Browser).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowserSettings {
    /// Scheme prefixed to node ids to form resource uris
    pub resource_scheme: String,
    /// Group assigned to locally created items
    pub default_group: String,
    /// Stem for generated names (`untitled-1`, `untitled-2`, ...)
    pub untitled_stem: String,
    /// Media type used when the file extension tells nothing
    pub default_media_type: String,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            resource_scheme: "pebble".to_string(),
            default_group: "dba".to_string(),
            untitled_stem: "untitled".to_string(),
            default_media_type: "text/plain".to_string(),
        }
    }
}
