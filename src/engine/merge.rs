//! Priority-aware deep merge of a user document over shipped defaults.
//!
//! Implements the user-wins merge with:
//! - Mappings: deep-merge by key
//! - Sequences: the user's sequence is kept as a whole
//! - Scalars and mismatched kinds: the user's value is kept
//! - Keys only present in the defaults: added, and the merge reports a change

use crate::tree::{ConfigTree, Mapping, Value};

/// Result of merging a user tree with its defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub merged: ConfigTree,
    /// True when `merged` differs from the user tree, i.e. default keys were
    /// materialized and the user document should be rewritten.
    pub changed: bool,
}

/// Merge `user` over `defaults`.
pub fn merge(user: &ConfigTree, defaults: &ConfigTree) -> MergeOutcome {
    let (merged, changed) = merge_mappings(user.as_mapping(), defaults.as_mapping());
    MergeOutcome {
        merged: ConfigTree::from_mapping(merged),
        changed,
    }
}

fn merge_mappings(user: &Mapping, defaults: &Mapping) -> (Mapping, bool) {
    let mut changed = false;
    let mut merged = Mapping::with_capacity(user.len().max(defaults.len()));

    for (key, user_value) in user {
        let value = match (user_value, defaults.get(key)) {
            // Sequences are atomic choices owned by the user
            (Value::Sequence(_), Some(Value::Sequence(_))) => user_value.clone(),
            (Value::Mapping(user_map), Some(Value::Mapping(default_map))) => {
                let (nested, nested_changed) = merge_mappings(user_map, default_map);
                changed |= nested_changed;
                Value::Mapping(nested)
            }
            _ => user_value.clone(),
        };
        merged.insert(key.clone(), value);
    }

    for (key, default_value) in defaults {
        if !user.contains_key(key) {
            merged.insert(key.clone(), default_value.clone());
            changed = true;
        }
    }

    (merged, changed)
}
