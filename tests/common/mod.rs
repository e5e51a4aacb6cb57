//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use config_reconciler::error::{ConfigError, ConfigResult};
use config_reconciler::settings::ReconcilerSettings;
use config_reconciler::store::{ConfigStore, DocumentKey, DocumentKind, Registry, SettingHook, StoreLayout};
use config_reconciler::tree::Value;
use config_reconciler::watch::{Action, ActionConsumer, ManualChangeSource, Reconciler};

/// A store rooted in a temporary directory, with recording collaborators.
pub struct Fixture {
    pub dir: TempDir,
    pub layout: StoreLayout,
    pub store: Arc<ConfigStore>,
    pub source: Arc<ManualChangeSource>,
    pub hook: Arc<RecordingHook>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        fs::create_dir_all(layout.dir(DocumentKind::Default)).unwrap();

        let source = Arc::new(ManualChangeSource::new());
        let hook = Arc::new(RecordingHook::default());
        let store = Arc::new(
            ConfigStore::new(layout.clone(), Arc::new(Registry::new()), source.clone())
                .with_setting_hook(hook.clone()),
        );

        Self {
            dir,
            layout,
            store,
            source,
            hook,
        }
    }

    pub fn with_default(self, name: &str, text: &str) -> Self {
        self.write(DocumentKind::Default, name, text);
        self
    }

    pub fn with_user(self, name: &str, text: &str) -> Self {
        self.write(DocumentKind::User, name, text);
        self
    }

    pub fn path(&self, kind: DocumentKind, name: &str) -> PathBuf {
        self.layout.path(&DocumentKey::new(kind, name))
    }

    pub fn write(&self, kind: DocumentKind, name: &str, text: &str) {
        let path = self.path(kind, name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    pub fn read_user(&self, name: &str) -> String {
        fs::read_to_string(self.path(DocumentKind::User, name)).unwrap()
    }

    /// Reconciler for the `config` document wired to `consumer`.
    pub fn reconciler(&self, consumer: Arc<dyn ActionConsumer>) -> Reconciler {
        Reconciler::new(self.store.clone(), consumer, &ReconcilerSettings::default())
    }
}

/// Records every `apply_setting` call.
#[derive(Default)]
pub struct RecordingHook {
    calls: Mutex<Vec<(String, String, Value)>>,
}

impl RecordingHook {
    pub fn calls(&self) -> Vec<(String, String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

impl SettingHook for RecordingHook {
    fn apply_setting(&self, name: &str, path: &str, value: &Value) {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), path.to_string(), value.clone()));
    }
}

/// Records every action and optionally rejects them.
#[derive(Default)]
pub struct RecordingConsumer {
    actions: Mutex<Vec<Action>>,
    reject: bool,
}

impl RecordingConsumer {
    pub fn rejecting() -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }
}

impl ActionConsumer for RecordingConsumer {
    fn apply_action(&self, action: &Action) -> ConfigResult<()> {
        self.actions.lock().unwrap().push(action.clone());
        if self.reject {
            return Err(ConfigError::ActionDispatch("consumer offline".to_string()));
        }
        Ok(())
    }
}

/// Parse YAML text into a value, for building expected targets.
pub fn yaml(text: &str) -> Value {
    Value::from(config_reconciler::tree::TreeCodec::parse(text).unwrap())
}
