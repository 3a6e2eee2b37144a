//! Path algebra over remote uris.
//!
//! Remote uris are absolute, `/`-separated strings (`/db/apps/data.xml`).
//! Everything in here is pure string manipulation; nothing touches the tree
//! or the store.

use std::collections::{BTreeMap, HashSet};

use crate::item::{Collection, Document, Item};

/// Segment separator for remote uris.
pub const SEPARATOR: char = '/';

/// Drop the last segment of `uri`.
///
/// `"/db/a/b"` becomes `"/db/a"`, `"/db"` becomes `""` and `""` stays `""`.
pub fn parent_collection(uri: &str) -> String {
    match uri.rfind(SEPARATOR) {
        Some(pos) => uri[..pos].to_string(),
        None => String::new(),
    }
}

/// Last segment of `uri`, or the whole string when it has no separator.
pub fn leaf_name(uri: &str) -> &str {
    match uri.rsplit(SEPARATOR).next() {
        Some(name) if !name.is_empty() => name,
        _ => uri,
    }
}

/// Join a collection uri and a child name with exactly one separator.
pub fn collection_dir(collection: &str, name: &str) -> String {
    let trailing = collection.ends_with(SEPARATOR);
    let leading = name.starts_with(SEPARATOR);
    match (trailing, leading) {
        (true, true) => format!("{}{}", collection, &name[1..]),
        (false, false) => format!("{}{}{}", collection, SEPARATOR, name),
        _ => format!("{}{}", collection, name),
    }
}

/// True when `uri` equals `ancestor` or lies anywhere below it.
pub fn is_within(uri: &str, ancestor: &str) -> bool {
    if uri == ancestor {
        return true;
    }
    let base = ancestor.trim_end_matches(SEPARATOR);
    uri.strip_prefix(base)
        .is_some_and(|rest| rest.starts_with(SEPARATOR))
}

/// Number of leading segments shared by every path, always leaving at least
/// one segment on each of them.
fn common_segments(split: &[Vec<&str>]) -> usize {
    let min_len = split.iter().map(Vec::len).min().unwrap_or(0);
    let mut common = 0;
    while common + 1 < min_len {
        let test = split[0][common];
        if split.iter().all(|segments| segments[common] == test) {
            common += 1;
        } else {
            break;
        }
    }
    common
}

/// Strip a shared root from a set of paths.
///
/// With `top_dir` the prefix is removed literally. Without it the longest
/// run of leading segments common to every path is removed; a single path
/// is reduced to its containing directory instead.
pub fn clean<S: AsRef<str>>(paths: &[S], top_dir: Option<&str>) -> Vec<String> {
    if let Some(top) = top_dir.filter(|top| !top.is_empty()) {
        return paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                path.strip_prefix(top).unwrap_or(path).to_string()
            })
            .collect();
    }

    match paths {
        [] => Vec::new(),
        [single] => vec![parent_collection(single.as_ref())],
        _ => {
            let split: Vec<Vec<&str>> = paths
                .iter()
                .map(|path| path.as_ref().split(SEPARATOR).collect())
                .collect();
            let common = common_segments(&split);
            split
                .iter()
                .map(|segments| segments[common..].join("/"))
                .collect()
        }
    }
}

/// The shared root that [`clean`] would strip, with a trailing separator.
///
/// For a single path this is its directory.
pub fn top_dir<S: AsRef<str>>(paths: &[S]) -> String {
    match paths {
        [] => String::new(),
        [single] => format!("{}{}", parent_collection(single.as_ref()), SEPARATOR),
        _ => {
            let split: Vec<Vec<&str>> = paths
                .iter()
                .map(|path| path.as_ref().split(SEPARATOR).collect())
                .collect();
            let common = common_segments(&split);
            split[0][..common]
                .iter()
                .map(|segment| format!("{}{}", segment, SEPARATOR))
                .collect()
        }
    }
}

/// Re-key a file set with [`clean`] applied to its names.
pub fn clean_file_map<V>(files: BTreeMap<String, V>, top_dir: Option<&str>) -> BTreeMap<String, V> {
    let keys: Vec<String> = files.keys().cloned().collect();
    let cleaned = clean(&keys, top_dir);
    files
        .into_values()
        .zip(cleaned)
        .map(|(value, key)| (key, value))
        .collect()
}

/// Fold a flat descendant listing into the direct children of `top_dir`.
///
/// Documents nested more than one level below `top_dir` are truncated at the
/// first separator past it and become placeholder collections. Entries that
/// end up with the same name are merged, keeping the first.
pub fn clean_items(documents: Vec<Document>, top_dir: &str) -> Vec<Item> {
    let start = top_dir.len() + 1;
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for document in documents {
        let cut = document
            .name
            .get(start..)
            .and_then(|rest| rest.find(SEPARATOR))
            .map(|pos| pos + start);

        let item = match cut {
            Some(pos) => Item::Collection(Collection {
                name: document.name[..pos].to_string(),
                created: document.created,
                owner: document.owner,
                group: document.group,
                acl: Vec::new(),
                collections: Vec::new(),
                documents: Vec::new(),
            }),
            None => Item::Document(document),
        };

        if seen.insert(item.name().to_string()) {
            result.push(item);
        }
    }

    result
}
