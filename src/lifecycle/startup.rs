//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the store from validated settings
//! - Materialize user documents from defaults
//! - Hand back a reconciler and the event channel it should drain
//!
//! # Design Decisions
//! - Fail fast: any initialization error is fatal
//! - The caller owns task spawning so tests can drive the reconciler directly

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::error::ConfigResult;
use crate::settings::EngineSettings;
use crate::store::{ConfigStore, DocumentKey, InitSummary, Registry, SettingHook, StoreLayout};
use crate::watch::{ActionConsumer, NotifyChangeSource, Reconciler};

/// A fully wired engine, ready to run.
pub struct Engine {
    pub store: Arc<ConfigStore>,
    pub reconciler: Reconciler,
    pub changes: mpsc::UnboundedReceiver<DocumentKey>,
    pub summary: InitSummary,
}

/// Wire settings into a store, initialize it and build the reconciler.
pub fn bootstrap(
    settings: &EngineSettings,
    consumer: Arc<dyn ActionConsumer>,
    hook: Arc<dyn SettingHook>,
) -> ConfigResult<Engine> {
    info!(
        root = %settings.storage.root.display(),
        primary = %settings.reconciler.primary_document,
        "Bootstrapping configuration store"
    );

    let (source, changes) = NotifyChangeSource::new(settings.reconciler.poll_interval());
    let store = Arc::new(
        ConfigStore::new(
            StoreLayout::from_settings(&settings.storage),
            Arc::new(Registry::new()),
            Arc::new(source),
        )
        .with_setting_hook(hook)
        .with_server_key(settings.reconciler.reserved_namespace.clone()),
    );

    let summary = store.initialize()?;
    let reconciler = Reconciler::new(store.clone(), consumer, &settings.reconciler);

    Ok(Engine {
        store,
        reconciler,
        changes,
        summary,
    })
}
