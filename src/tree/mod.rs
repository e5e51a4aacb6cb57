//! Configuration tree model and text codecs.
//!
//! # Data Flow
//! ```text
//! document text (YAML)
//!     → codec.rs (parse → ConfigTree)
//!     → engine (merge / diff on ConfigTree)
//!     → codec.rs (serialize → text) for whole-document rewrites
//!
//! single-key writes:
//!     document text → line_editor.rs (rewrite one line) → text
//! ```
//!
//! # Design Decisions
//! - Paths are dotted key chains (`servers.myhost.enabled`)
//! - Writing through a missing or scalar intermediate creates mappings
//! - The line editor is independent of the tree codec so untouched lines,
//!   comments and ordering survive a single-key write

pub mod codec;
pub mod line_editor;
pub mod value;

pub use codec::{ParseError, TreeCodec};
pub use line_editor::{LineEditError, LineEditor};
pub use value::{Mapping, Value};

/// Split a dotted path into its key segments.
pub fn split_path(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('.').collect()
    }
}

/// Join a parent path and a child key.
pub fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// One parsed configuration document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    root: Mapping,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mapping(root: Mapping) -> Self {
        Self { root }
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.root
    }

    pub fn into_mapping(self) -> Mapping {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Look up the value at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.get_in(&split_path(path))
    }

    /// Look up the value under an explicit key chain. Keys may contain dots.
    pub fn get_in<S: AsRef<str>>(&self, keys: &[S]) -> Option<&Value> {
        let (first, rest) = keys.split_first()?;
        let mut current = self.root.get(first.as_ref())?;
        for key in rest {
            current = current.as_mapping()?.get(key.as_ref())?;
        }
        Some(current)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        let segments = split_path(path);
        let (first, rest) = segments.split_first()?;
        let mut current = self.root.get_mut(*first)?;
        for segment in rest {
            current = current.as_mapping_mut()?.get_mut(*segment)?;
        }
        Some(current)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Write `value` at `path`, creating intermediate mappings as needed.
    ///
    /// An intermediate that currently holds a non-mapping value is replaced
    /// by an empty mapping. Returns the previous value, if any.
    pub fn set(&mut self, path: &str, value: Value) -> Option<Value> {
        self.set_in(&split_path(path), value)
    }

    /// [`set`](Self::set) with an explicit key chain.
    pub fn set_in<S: AsRef<str>>(&mut self, keys: &[S], value: Value) -> Option<Value> {
        let (last, parents) = keys.split_last()?;
        let mut current = &mut self.root;
        for key in parents {
            let slot = current
                .entry(key.as_ref().to_string())
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if !matches!(slot, Value::Mapping(_)) {
                *slot = Value::Mapping(Mapping::new());
            }
            current = match slot {
                Value::Mapping(map) => map,
                _ => unreachable!("intermediate was just replaced by a mapping"),
            };
        }
        current.insert(last.as_ref().to_string(), value)
    }

    /// Remove the value at `path`, preserving the order of its siblings.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        self.remove_in(&split_path(path))
    }

    /// [`remove`](Self::remove) with an explicit key chain.
    pub fn remove_in<S: AsRef<str>>(&mut self, keys: &[S]) -> Option<Value> {
        let (last, parents) = keys.split_last()?;
        let mut current = &mut self.root;
        for key in parents {
            current = current.get_mut(key.as_ref())?.as_mapping_mut()?;
        }
        current.shift_remove(last.as_ref())
    }
}

impl From<Mapping> for ConfigTree {
    fn from(root: Mapping) -> Self {
        Self::from_mapping(root)
    }
}

impl From<ConfigTree> for Value {
    fn from(tree: ConfigTree) -> Self {
        Value::Mapping(tree.root)
    }
}
