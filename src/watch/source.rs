//! File change sources.
//!
//! The store asks a [`ChangeSource`] to watch every document it loads. The
//! production source wraps `notify` and forwards the document key of each
//! modified file into an unbounded channel drained by the reconciler.
//!
//! Editors often save by writing a temporary file and renaming it over the
//! document, which replaces the inode. The notify source therefore watches
//! the parent directory and matches event paths against the registered
//! documents, so a watch survives any number of such saves.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

use crate::error::{ConfigError, ConfigResult};
use crate::store::DocumentKey;

/// Keeps a watch alive. Dropping it stops the watch.
pub struct WatchHandle {
    _guard: Option<Box<dyn Any + Send>>,
}

impl WatchHandle {
    pub fn new<T: Send + 'static>(guard: T) -> Self {
        Self {
            _guard: Some(Box::new(guard)),
        }
    }

    /// Handle for a source that holds no OS resources.
    pub fn detached() -> Self {
        Self { _guard: None }
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self._guard.is_some())
            .finish()
    }
}

/// Something that can report modifications of a document file.
pub trait ChangeSource: Send + Sync {
    fn watch(&self, key: &DocumentKey, path: &Path) -> ConfigResult<WatchHandle>;
}

type WatchedFiles = Arc<Mutex<HashMap<PathBuf, DocumentKey>>>;

/// One directory watcher plus the directories it already covers.
struct DirectoryWatch {
    watcher: RecommendedWatcher,
    dirs: HashSet<PathBuf>,
}

/// `notify` backed source.
pub struct NotifyChangeSource {
    events: mpsc::UnboundedSender<DocumentKey>,
    poll_interval: Duration,
    files: WatchedFiles,
    dirs: Mutex<Option<DirectoryWatch>>,
}

impl NotifyChangeSource {
    /// Create a source and the receiver its events arrive on.
    pub fn new(poll_interval: Duration) -> (Self, mpsc::UnboundedReceiver<DocumentKey>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                events,
                poll_interval,
                files: Arc::new(Mutex::new(HashMap::new())),
                dirs: Mutex::new(None),
            },
            rx,
        )
    }

    fn start_watcher(&self) -> notify::Result<RecommendedWatcher> {
        let tx = self.events.clone();
        let files = self.files.clone();

        RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    // Renames arrive as modify events naming the target path.
                    if !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    let files = files.lock().unwrap_or_else(PoisonError::into_inner);
                    for key in event.paths.iter().filter_map(|path| files.get(path)) {
                        trace!(document = %key, kind = ?event.kind, "Document file event");
                        let _ = tx.send(key.clone());
                    }
                }
                Err(e) => error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )
    }
}

impl ChangeSource for NotifyChangeSource {
    fn watch(&self, key: &DocumentKey, path: &Path) -> ConfigResult<WatchHandle> {
        let watch_error = |source| ConfigError::Watch {
            path: path.to_path_buf(),
            source,
        };

        let file = path.canonicalize().map_err(|e| watch_error(notify::Error::io(e)))?;
        let dir = match file.parent() {
            Some(dir) => dir.to_path_buf(),
            None => return Err(watch_error(notify::Error::path_not_found())),
        };

        {
            let mut slot = self.dirs.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(DirectoryWatch {
                    watcher: self.start_watcher().map_err(watch_error)?,
                    dirs: HashSet::new(),
                });
            }
            if let Some(state) = slot.as_mut().filter(|state| !state.dirs.contains(&dir)) {
                state
                    .watcher
                    .watch(&dir, RecursiveMode::NonRecursive)
                    .map_err(watch_error)?;
                debug!(dir = ?dir, "Directory watch added");
                state.dirs.insert(dir);
            }
        }

        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file.clone(), key.clone());

        info!(document = %key, path = ?file, "Document watcher started");
        Ok(WatchHandle::new(FileRegistration {
            files: self.files.clone(),
            file,
        }))
    }
}

/// Stops forwarding events for one file when dropped.
struct FileRegistration {
    files: WatchedFiles,
    file: PathBuf,
}

impl Drop for FileRegistration {
    fn drop(&mut self) {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.file);
    }
}

/// Source that records watch requests and never fires. Changes are fed to
/// the reconciler by hand.
#[derive(Debug, Default)]
pub struct ManualChangeSource {
    watched: Mutex<Vec<(DocumentKey, PathBuf)>>,
}

impl ManualChangeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys watched so far, in request order.
    pub fn watched(&self) -> Vec<DocumentKey> {
        self.watched
            .lock()
            .expect("watch list mutex poisoned")
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl ChangeSource for ManualChangeSource {
    fn watch(&self, key: &DocumentKey, path: &Path) -> ConfigResult<WatchHandle> {
        self.watched
            .lock()
            .expect("watch list mutex poisoned")
            .push((key.clone(), path.to_path_buf()));
        Ok(WatchHandle::detached())
    }
}
