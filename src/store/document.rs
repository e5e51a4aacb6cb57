//! Document identity and on-disk layout.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};
use crate::settings::StorageSettings;

/// Which side of the layered configuration a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Read-write document owned by the user.
    User,
    /// Read-only template shipped with the system.
    Default,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::User => "user",
            DocumentKind::Default => "default",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" | "config" => Ok(DocumentKind::User),
            "default" | "default_config" => Ok(DocumentKind::Default),
            other => Err(format!("unknown document kind '{}' (expected user or default)", other)),
        }
    }
}

/// Identifies one logical configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DocumentKey {
    pub kind: DocumentKind,
    pub name: String,
}

impl DocumentKey {
    pub fn new(kind: DocumentKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self::new(DocumentKind::User, name)
    }

    pub fn default_doc(name: impl Into<String>) -> Self {
        Self::new(DocumentKind::Default, name)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

/// Maps document keys to backing files.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
    default_dir: String,
    user_dir: String,
    extension: String,
}

impl StoreLayout {
    /// Layout under `root` with the standard directory names.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let defaults = StorageSettings::default();
        Self {
            root: root.into(),
            default_dir: defaults.default_dir,
            user_dir: defaults.user_dir,
            extension: defaults.extension,
        }
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self {
            root: settings.root.clone(),
            default_dir: settings.default_dir.clone(),
            user_dir: settings.user_dir.clone(),
            extension: settings.extension.clone(),
        }
    }

    pub fn dir(&self, kind: DocumentKind) -> PathBuf {
        match kind {
            DocumentKind::User => self.root.join(&self.user_dir),
            DocumentKind::Default => self.root.join(&self.default_dir),
        }
    }

    pub fn path(&self, key: &DocumentKey) -> PathBuf {
        self.dir(key.kind)
            .join(format!("{}.{}", key.name, self.extension))
    }

    /// Names of all shipped default documents, sorted.
    pub fn default_documents(&self) -> ConfigResult<Vec<String>> {
        let dir = self.dir(DocumentKind::Default);
        let entries = fs::read_dir(&dir).map_err(|e| ConfigError::io(&dir, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ConfigError::io(&dir, e))?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
