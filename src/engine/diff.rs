//! Structural diff between two configuration trees.
//!
//! Mappings are compared key by key and recursed into; every other value,
//! sequences included, is compared as a whole. The result is a flat list of
//! dotted paths in document order: entries for keys of the old tree first,
//! then keys that only exist in the new tree.

use serde::Serialize;

use crate::tree::{ConfigTree, Mapping, Value};

/// One changed path between two tree states.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    /// Dotted form of `keys`, for display.
    pub path: String,
    /// Key chain from the root. Authoritative when keys contain dots.
    #[serde(skip)]
    pub keys: Vec<String>,
    /// `None` when the key was added.
    pub old_value: Option<Value>,
    /// `None` when the key was removed.
    pub new_value: Option<Value>,
}

impl DiffEntry {
    pub fn new(keys: Vec<String>, old_value: Option<Value>, new_value: Option<Value>) -> Self {
        Self {
            path: keys.join("."),
            keys,
            old_value,
            new_value,
        }
    }
}

/// Compute every changed path from `old` to `new`.
pub fn diff(old: &ConfigTree, new: &ConfigTree) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    diff_mappings(old.as_mapping(), new.as_mapping(), &[], &mut entries);
    entries
}

/// Diff two mappings found under the key chain `prefix`.
pub fn diff_mappings(old: &Mapping, new: &Mapping, prefix: &[String], out: &mut Vec<DiffEntry>) {
    let child = |key: &str| {
        let mut keys = prefix.to_vec();
        keys.push(key.to_string());
        keys
    };

    for (key, old_value) in old {
        match (old_value, new.get(key)) {
            (Value::Mapping(old_map), Some(Value::Mapping(new_map))) => {
                diff_mappings(old_map, new_map, &child(key), out);
            }
            (_, Some(new_value)) if new_value == old_value => {}
            (_, new_value) => out.push(DiffEntry::new(
                child(key),
                Some(old_value.clone()),
                new_value.cloned(),
            )),
        }
    }

    for (key, new_value) in new {
        if !old.contains_key(key) {
            out.push(DiffEntry::new(child(key), None, Some(new_value.clone())));
        }
    }
}

/// Replay `entries` onto `tree`, writing each new value or removing the key.
pub fn apply(tree: &mut ConfigTree, entries: &[DiffEntry]) {
    for entry in entries {
        match &entry.new_value {
            Some(value) => {
                tree.set_in(&entry.keys, value.clone());
            }
            None => {
                tree.remove_in(&entry.keys);
            }
        }
    }
}
