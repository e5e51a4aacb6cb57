//! Process-wide document cache.
//!
//! # Responsibilities
//! - Own the cached tree, the diff baseline and the watch handle of every
//!   document key
//! - Serialize all access behind one mutex so a change event advances the
//!   baseline exactly once
//!
//! # Design Decisions
//! - One entry per `(kind, name)`, created by the first successful load or
//!   write. Entries are never removed, only emptied
//! - A poisoned lock is recovered: every writer leaves entries consistent
//!   before it can panic

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::store::DocumentKey;
use crate::tree::ConfigTree;
use crate::watch::WatchHandle;

/// State kept for one document key.
#[derive(Debug, Default)]
pub struct CacheEntry {
    /// Parsed tree; `None` after eviction until the next read.
    pub(crate) tree: Option<ConfigTree>,
    /// Diff baseline, replaced wholesale on every reconciliation.
    pub(crate) snapshot: Option<ConfigTree>,
    /// Present once the backing file is being watched.
    pub(crate) watch: Option<WatchHandle>,
}

/// Shared owner of every cache entry.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Mutex<HashMap<DocumentKey, CacheEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, HashMap<DocumentKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True when a parsed tree is cached for `key`.
    pub fn is_cached(&self, key: &DocumentKey) -> bool {
        self.lock().get(key).is_some_and(|entry| entry.tree.is_some())
    }

    /// True once the backing file of `key` is watched.
    pub fn is_watching(&self, key: &DocumentKey) -> bool {
        self.lock().get(key).is_some_and(|entry| entry.watch.is_some())
    }

    /// Copy of the current diff baseline for `key`.
    pub fn snapshot(&self, key: &DocumentKey) -> Option<ConfigTree> {
        self.lock().get(key).and_then(|entry| entry.snapshot.clone())
    }

    /// Number of documents ever loaded or written.
    pub fn document_count(&self) -> usize {
        self.lock().len()
    }

    /// Number of watched documents.
    pub fn watched_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|entry| entry.watch.is_some())
            .count()
    }
}
