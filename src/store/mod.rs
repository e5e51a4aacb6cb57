//! Layered document store.
//!
//! # Data Flow
//! ```text
//! default_config/<name>.yaml ──┐
//!                              ├─→ initialize (copy or merge) → config/<name>.yaml
//! config/<name>.yaml ──────────┘
//!
//! get(kind, name) → registry hit? → cached tree
//!                 → miss → read file → start watch → parse → cache (+ first baseline)
//!
//! set / set_array_slot / append_or_remove_array_entry / remove_server_entry_by_name
//!     → read user text → edit → write → evict cache, replay edit onto baseline
//! ```
//!
//! # Responsibilities
//! - Materialize user documents from shipped defaults
//! - Serve parsed trees from the cache, loading and watching lazily
//! - Perform every mutation under the registry lock
//!
//! # Design Decisions
//! - Single-key writes go through the line editor and are verified by
//!   re-parsing; anything the editor cannot express falls back to a full
//!   rewrite of the document
//! - A write by the store replays only its own edit onto the baseline. The
//!   watcher event for the write then diffs empty, while external edits not
//!   yet seen by the watcher still show up
//! - Hooks run after the lock is released

mod document;
mod hooks;
mod registry;

pub use document::{DocumentKey, DocumentKind, StoreLayout};
pub use hooks::{LoggingSettingHook, SettingHook};
pub use registry::{CacheEntry, Registry};

use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::engine::{self, DiffEntry};
use crate::error::{ConfigError, ConfigResult};
use crate::observability::metrics;
use crate::tree::{join_path, ConfigTree, LineEditor, TreeCodec, Value};
use crate::watch::ChangeSource;

/// Key that holds server entries in the primary document.
pub const DEFAULT_SERVER_KEY: &str = "servers";

/// Direction of an array membership edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayEdit {
    Append,
    Remove,
}

/// What `initialize` did to each user document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InitSummary {
    /// Copied verbatim from the default because no user document existed.
    pub created: Vec<String>,
    /// Rewritten because defaults added settings.
    pub merged: Vec<String>,
    /// Already up to date.
    pub unchanged: Vec<String>,
    /// Left alone because the user document failed to parse.
    pub skipped: Vec<String>,
}

/// Outcome of re-reading a document and advancing its baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum Reload {
    /// No baseline existed; the fresh tree became the first one.
    Baseline(ConfigTree),
    /// The baseline moved from `previous` to `current`.
    Advanced {
        previous: ConfigTree,
        current: ConfigTree,
    },
}

type Entries = HashMap<DocumentKey, CacheEntry>;

/// Reads, writes and caches configuration documents.
pub struct ConfigStore {
    layout: StoreLayout,
    registry: Arc<Registry>,
    changes: Arc<dyn ChangeSource>,
    hook: Arc<dyn SettingHook>,
    server_key: String,
}

impl ConfigStore {
    pub fn new(layout: StoreLayout, registry: Arc<Registry>, changes: Arc<dyn ChangeSource>) -> Self {
        Self {
            layout,
            registry,
            changes,
            hook: Arc::new(LoggingSettingHook),
            server_key: DEFAULT_SERVER_KEY.to_string(),
        }
    }

    pub fn with_setting_hook(mut self, hook: Arc<dyn SettingHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Override the key `remove_server_entry_by_name` edits.
    pub fn with_server_key(mut self, key: impl Into<String>) -> Self {
        self.server_key = key.into();
        self
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Bring every user document in line with the shipped defaults.
    ///
    /// Missing user documents are created as verbatim copies. Existing ones
    /// receive any keys only the defaults carry. A default that cannot be
    /// read or parsed aborts startup; a malformed user document is skipped.
    pub fn initialize(&self) -> ConfigResult<InitSummary> {
        let user_dir = self.layout.dir(DocumentKind::User);
        fs::create_dir_all(&user_dir).map_err(|e| ConfigError::io(&user_dir, e))?;

        let names = self.layout.default_documents()?;
        let mut summary = InitSummary::default();
        let mut materialized = Vec::new();

        {
            let mut entries = self.registry.lock();
            for name in &names {
                for entry in self.initialize_document(&mut entries, name, &mut summary)? {
                    if let Some(value) = entry.new_value {
                        leaf_settings(&entry.path, value, &mut |path, value| {
                            materialized.push((name.clone(), path, value))
                        });
                    }
                }
            }
        }

        for (name, path, value) in &materialized {
            self.hook.apply_setting(name, path, value);
        }

        for name in &names {
            if let Err(err) = self.get(DocumentKind::User, name) {
                warn!(document = %name, error = %err, "User document not loaded after initialization");
            }
        }

        info!(
            created = summary.created.len(),
            merged = summary.merged.len(),
            unchanged = summary.unchanged.len(),
            skipped = summary.skipped.len(),
            "Configuration initialized"
        );
        Ok(summary)
    }

    fn initialize_document(
        &self,
        entries: &mut Entries,
        name: &str,
        summary: &mut InitSummary,
    ) -> ConfigResult<Vec<DiffEntry>> {
        let default_key = DocumentKey::default_doc(name);
        let default_path = self.layout.path(&default_key);
        let default_text =
            fs::read_to_string(&default_path).map_err(|e| ConfigError::io(&default_path, e))?;
        let defaults = parse_document(&default_key, &default_text)?;

        let user_key = DocumentKey::user(name);
        let user_text = match self.read_optional(&user_key)? {
            Some(text) => text,
            None => {
                let replacement = defaults.clone();
                self.commit(entries, &user_key, &default_text, defaults, |snapshot| *snapshot = replacement)?;
                info!(document = %name, "Created user document from defaults");
                summary.created.push(name.to_string());
                return Ok(Vec::new());
            }
        };

        let user = match parse_document(&user_key, &user_text) {
            Ok(tree) => tree,
            Err(err) => {
                warn!(document = %name, error = %err, "Skipping malformed user document");
                summary.skipped.push(name.to_string());
                return Ok(Vec::new());
            }
        };

        let outcome = engine::merge(&user, &defaults);
        if !outcome.changed {
            debug!(document = %name, "User document already has every default");
            summary.unchanged.push(name.to_string());
            return Ok(Vec::new());
        }

        let added = engine::diff(&user, &outcome.merged);
        let text = serialize_document(&user_key, &outcome.merged)?;
        self.commit(entries, &user_key, &text, outcome.merged, |snapshot| engine::apply(snapshot, &added))?;
        metrics::record_defaults_merged(name);
        info!(document = %name, added = added.len(), "Merged new defaults into user document");
        summary.merged.push(name.to_string());
        Ok(added)
    }

    /// Parsed tree for a document, served from the cache when present.
    ///
    /// The first read of a document starts watching its file and records the
    /// parsed tree as the diff baseline.
    pub fn get(&self, kind: DocumentKind, name: &str) -> ConfigResult<ConfigTree> {
        let key = DocumentKey::new(kind, name);
        let mut entries = self.registry.lock();
        if let Some(tree) = entries.get(&key).and_then(|entry| entry.tree.as_ref()) {
            return Ok(tree.clone());
        }

        // Missing documents leave no entry behind.
        let path = self.layout.path(&key);
        let text = fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?;
        let entry = entries.entry(key.clone()).or_default();
        if entry.watch.is_none() {
            entry.watch = Some(self.changes.watch(&key, &path)?);
            debug!(document = %key, path = %path.display(), "Watching document");
        }

        let tree = parse_document(&key, &text)?;
        metrics::record_document_loaded(kind.as_str());
        if entry.snapshot.is_none() {
            entry.snapshot = Some(tree.clone());
        }
        entry.tree = Some(tree.clone());
        Ok(tree)
    }

    /// Value at `path`, or `None` when the path is absent.
    pub fn get_value(&self, kind: DocumentKind, name: &str, path: &str) -> ConfigResult<Option<Value>> {
        Ok(self.get(kind, name)?.get(path).cloned())
    }

    /// Value at `path`, falling back to `default` on any failure.
    ///
    /// A document that does not parse is scanned line by line for a plain
    /// scalar before giving up.
    pub fn value_or(&self, kind: DocumentKind, name: &str, path: &str, default: impl Into<Value>) -> Value {
        let default = default.into();
        match self.get_value(kind, name, path) {
            Ok(Some(Value::Null)) | Ok(None) => default,
            Ok(Some(value)) => value,
            Err(ConfigError::Parse { .. }) => {
                let file = self.layout.path(&DocumentKey::new(kind, name));
                let found = fs::read_to_string(&file)
                    .ok()
                    .and_then(|text| LineEditor::get_scalar(&text, path))
                    .filter(|value| *value != Value::Null);
                match found {
                    Some(value) => {
                        debug!(document = %name, path = %path, "Read value from malformed document by line");
                        value
                    }
                    None => default,
                }
            }
            Err(err) => {
                if !err.is_not_found() {
                    warn!(document = %name, path = %path, error = %err, "Falling back to default value");
                }
                default
            }
        }
    }

    /// Write one value into a user document, creating the document and any
    /// missing parents.
    pub fn set(&self, name: &str, path: &str, value: impl Into<Value>) -> ConfigResult<()> {
        let value = value.into();
        let key = DocumentKey::user(name);
        let mut entries = self.registry.lock();

        let text = self.read_optional(&key)?.unwrap_or_default();
        let mut expected = parse_document(&key, &text)?;
        expected.set(path, value.clone());

        let written = match LineEditor::set_scalar(&text, path, &value) {
            Ok(edited) if TreeCodec::parse(&edited).is_ok_and(|tree| tree == expected) => edited,
            Ok(_) => {
                debug!(document = %key, path = %path, "Line edit did not round-trip, rewriting document");
                serialize_document(&key, &expected)?
            }
            Err(err) => {
                debug!(document = %key, path = %path, reason = %err, "Rewriting document");
                serialize_document(&key, &expected)?
            }
        };

        self.commit(&mut entries, &key, &written, expected, |snapshot| {
            snapshot.set(path, value);
        })?;
        info!(document = %key, path = %path, "Setting updated");
        Ok(())
    }

    /// Replace element `index` of the sequence at `path`. An index equal to
    /// the length appends.
    pub fn set_array_slot(&self, name: &str, path: &str, index: usize, value: impl Into<Value>) -> ConfigResult<()> {
        let key = DocumentKey::user(name);
        let mut entries = self.registry.lock();
        let mut tree = self.read_user_tree(&key)?;

        let sequence = sequence_at(&mut tree, &key, path)?;
        let len = sequence.len();
        match index {
            i if i < len => sequence[i] = value.into(),
            i if i == len => sequence.push(value.into()),
            _ => {
                return Err(ConfigError::IndexOutOfRange {
                    path: path.to_string(),
                    index,
                    len,
                })
            }
        }

        let text = serialize_document(&key, &tree)?;
        let replay = carry_path(&tree, path);
        self.commit(&mut entries, &key, &text, tree, replay)?;
        info!(document = %key, path = %path, index, "Array slot updated");
        Ok(())
    }

    /// Append `value` to, or remove its first occurrence from, the sequence
    /// at `path`. Returns whether the document changed.
    ///
    /// Appending to a missing path creates a one-element sequence.
    pub fn append_or_remove_array_entry(
        &self,
        name: &str,
        path: &str,
        value: impl Into<Value>,
        edit: ArrayEdit,
    ) -> ConfigResult<bool> {
        let value = value.into();
        let key = DocumentKey::user(name);
        let mut entries = self.registry.lock();
        let mut tree = self.read_user_tree(&key)?;

        let modified = match edit {
            ArrayEdit::Append if !tree.contains(path) => {
                tree.set(path, Value::Sequence(vec![value]));
                true
            }
            ArrayEdit::Append => {
                sequence_at(&mut tree, &key, path)?.push(value);
                true
            }
            ArrayEdit::Remove if !tree.contains(path) => false,
            ArrayEdit::Remove => {
                let sequence = sequence_at(&mut tree, &key, path)?;
                match sequence.iter().position(|item| *item == value) {
                    Some(position) => {
                        sequence.remove(position);
                        true
                    }
                    None => false,
                }
            }
        };

        if !modified {
            debug!(document = %key, path = %path, "Array already without value");
            return Ok(false);
        }

        let text = serialize_document(&key, &tree)?;
        let replay = carry_path(&tree, path);
        self.commit(&mut entries, &key, &text, tree, replay)?;
        info!(document = %key, path = %path, edit = ?edit, "Array entry updated");
        Ok(true)
    }

    /// Remove the server called `server` from a user document.
    ///
    /// Servers may be a sequence of mappings carrying a `name` field or a
    /// mapping keyed by server name.
    pub fn remove_server_entry_by_name(&self, name: &str, server: &str) -> ConfigResult<()> {
        let key = DocumentKey::user(name);
        let mut entries = self.registry.lock();
        let mut tree = self.read_user_tree(&key)?;

        if !remove_server(&mut tree, &self.server_key, server) {
            return Err(ConfigError::MissingKey {
                document: key.to_string(),
                path: format!("{}.{}", self.server_key, server),
            });
        }

        let text = serialize_document(&key, &tree)?;
        self.commit(&mut entries, &key, &text, tree, |snapshot| {
            remove_server(snapshot, &self.server_key, server);
        })?;
        info!(document = %key, server = %server, "Server entry removed");
        Ok(())
    }

    /// Drop the cached tree for `key`. Returns whether one was cached.
    pub fn evict(&self, key: &DocumentKey) -> bool {
        let mut entries = self.registry.lock();
        entries
            .get_mut(key)
            .is_some_and(|entry| entry.tree.take().is_some())
    }

    /// Re-read `key` from disk and make the result both the cached tree and
    /// the new baseline, in one critical section.
    ///
    /// On failure the previous baseline is kept and the cache stays empty.
    pub fn reload_and_advance(&self, key: &DocumentKey) -> ConfigResult<Reload> {
        let mut entries = self.registry.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.tree = None;
        }

        let path = self.layout.path(key);
        let text = fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?;
        let current = parse_document(key, &text)?;
        metrics::record_document_loaded(key.kind.as_str());

        let entry = entries.entry(key.clone()).or_default();
        entry.tree = Some(current.clone());
        Ok(match entry.snapshot.replace(current.clone()) {
            Some(previous) => Reload::Advanced { previous, current },
            None => Reload::Baseline(current),
        })
    }

    pub fn snapshot(&self, key: &DocumentKey) -> Option<ConfigTree> {
        self.registry.snapshot(key)
    }

    pub fn is_watching(&self, key: &DocumentKey) -> bool {
        self.registry.is_watching(key)
    }

    fn read_optional(&self, key: &DocumentKey) -> ConfigResult<Option<String>> {
        let path = self.layout.path(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::io(&path, e)),
        }
    }

    fn read_user_tree(&self, key: &DocumentKey) -> ConfigResult<ConfigTree> {
        let path = self.layout.path(key);
        let text = fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?;
        parse_document(key, &text)
    }

    /// Write `text`, drop the cached tree and bring the baseline along.
    ///
    /// `replay` repeats the edit on an existing baseline. Only a document
    /// without one takes `written` wholesale.
    fn commit(
        &self,
        entries: &mut Entries,
        key: &DocumentKey,
        text: &str,
        written: ConfigTree,
        replay: impl FnOnce(&mut ConfigTree),
    ) -> ConfigResult<()> {
        let path = self.layout.path(key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| ConfigError::io(dir, e))?;
        }
        fs::write(&path, text).map_err(|e| ConfigError::io(&path, e))?;

        let entry = entries.entry(key.clone()).or_default();
        entry.tree = None;
        match entry.snapshot.as_mut() {
            Some(snapshot) => replay(snapshot),
            None => entry.snapshot = Some(written),
        }
        Ok(())
    }
}

fn parse_document(key: &DocumentKey, text: &str) -> ConfigResult<ConfigTree> {
    TreeCodec::parse(text).map_err(|source| {
        metrics::record_parse_failure(key.kind.as_str());
        ConfigError::Parse {
            document: key.to_string(),
            source,
        }
    })
}

/// Flatten an added value into one call per leaf setting. Empty mappings
/// count as leaves.
fn leaf_settings(path: &str, value: Value, emit: &mut impl FnMut(String, Value)) {
    match value {
        Value::Mapping(mapping) if !mapping.is_empty() => {
            for (key, child) in mapping {
                leaf_settings(&join_path(path, &key), child, emit);
            }
        }
        other => emit(path.to_string(), other),
    }
}

/// Replay that copies the value `written` holds at `path`.
fn carry_path<'a>(written: &ConfigTree, path: &'a str) -> impl FnOnce(&mut ConfigTree) + 'a {
    let value = written.get(path).cloned();
    move |snapshot| match value {
        Some(value) => {
            snapshot.set(path, value);
        }
        None => {
            snapshot.remove(path);
        }
    }
}

fn remove_server(tree: &mut ConfigTree, server_key: &str, server: &str) -> bool {
    match tree.get_mut(server_key) {
        Some(Value::Sequence(items)) => {
            let position = items.iter().position(|item| {
                item.as_mapping()
                    .and_then(|mapping| mapping.get("name"))
                    .and_then(Value::as_str)
                    == Some(server)
            });
            position.map(|position| items.remove(position)).is_some()
        }
        Some(Value::Mapping(servers)) => servers.shift_remove(server).is_some(),
        _ => false,
    }
}

fn serialize_document(key: &DocumentKey, tree: &ConfigTree) -> ConfigResult<String> {
    TreeCodec::serialize(tree).map_err(|source| ConfigError::Serialize {
        document: key.to_string(),
        source,
    })
}

fn sequence_at<'a>(tree: &'a mut ConfigTree, key: &DocumentKey, path: &str) -> ConfigResult<&'a mut Vec<Value>> {
    match tree.get_mut(path) {
        Some(value) => value.as_sequence_mut().ok_or_else(|| ConfigError::NotASequence {
            document: key.to_string(),
            path: path.to_string(),
        }),
        None => Err(ConfigError::MissingKey {
            document: key.to_string(),
            path: path.to_string(),
        }),
    }
}
