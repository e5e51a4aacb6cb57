//! Engine settings schema.
//!
//! All types derive Serde traits for deserialization from the TOML settings
//! file; every field has a default so an absent file or section is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root settings for the reconciliation engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineSettings {
    /// Where default and user documents live.
    pub storage: StorageSettings,

    /// Watcher / reconciler behaviour.
    pub reconciler: ReconcilerSettings,

    /// Logging settings.
    pub observability: ObservabilitySettings,
}

/// Backing store layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding both document directories.
    pub root: PathBuf,

    /// Directory (under `root`) with shipped, read-only defaults.
    pub default_dir: String,

    /// Directory (under `root`) with user documents, created on demand.
    pub user_dir: String,

    /// Document file extension, without the dot.
    pub extension: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("config"),
            default_dir: "default_config".to_string(),
            user_dir: "config".to_string(),
            extension: "yaml".to_string(),
        }
    }
}

/// Reconciler settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcilerSettings {
    /// The user document whose edits drive action dispatch.
    pub primary_document: String,

    /// Top-level key whose changes become lifecycle actions.
    pub reserved_namespace: String,

    /// Document holding the `servers` list edited by name.
    pub server_list_document: String,

    /// Poll interval for watcher backends that poll.
    pub poll_interval_secs: u64,

    /// Quiet period that closes a burst of change events. Zero handles
    /// every event on arrival.
    pub debounce_ms: u64,
}

impl ReconcilerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            primary_document: "config".to_string(),
            reserved_namespace: "servers".to_string(),
            server_list_document: "ws-config".to_string(),
            poll_interval_secs: 2,
            debounce_ms: 200,
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it.
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
