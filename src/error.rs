//! Error types shared by the store, the watcher and the reconciler.

use std::path::PathBuf;
use thiserror::Error;

use crate::tree::ParseError;

/// Errors that can occur while reading, writing or watching documents.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Document text could not be parsed.
    #[error("failed to parse {document}: {source}")]
    Parse {
        document: String,
        #[source]
        source: ParseError,
    },

    /// A write targeted a path that has to exist already.
    #[error("key '{path}' not found in {document}")]
    MissingKey { document: String, path: String },

    /// An array operation targeted a value that is not a sequence.
    #[error("key '{path}' in {document} is not a sequence")]
    NotASequence { document: String, path: String },

    /// An array slot beyond the end of the sequence (plus one).
    #[error("index {index} out of range for '{path}' (length {len})")]
    IndexOutOfRange { path: String, index: usize, len: usize },

    /// Filesystem access failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document could not be serialized back to text.
    #[error("failed to serialize {document}: {source}")]
    Serialize {
        document: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The file watcher could not be installed.
    #[error("failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// The action consumer rejected an action.
    #[error("action dispatch failed: {0}")]
    ActionDispatch(String),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by a missing backing file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Result type for store and reconciler operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
