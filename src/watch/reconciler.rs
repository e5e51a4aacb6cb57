//! Turns document change events into server actions.
//!
//! Every event evicts the cached tree. Events for the primary document also
//! reload it, diff it against the baseline and dispatch one action per
//! classified server entry.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::engine::{self, diff_mappings, DiffEntry};
use crate::observability::metrics;
use crate::settings::ReconcilerSettings;
use crate::store::{ConfigStore, DocumentKey, Reload};
use crate::tree::{ConfigTree, Mapping, Value};
use crate::watch::{Action, ActionConsumer, ActionKind};

/// A continuous stream of events is cut off after this many windows.
const MAX_SETTLE_WINDOWS: u32 = 10;

/// Result of handling one change event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    /// Every difference between the old and new baseline.
    pub entries: Vec<DiffEntry>,
    /// Actions handed to the consumer, in dispatch order.
    pub actions: Vec<Action>,
}

pub struct Reconciler {
    store: Arc<ConfigStore>,
    consumer: Arc<dyn ActionConsumer>,
    primary: DocumentKey,
    namespace: String,
    debounce: Duration,
}

impl Reconciler {
    pub fn new(store: Arc<ConfigStore>, consumer: Arc<dyn ActionConsumer>, settings: &ReconcilerSettings) -> Self {
        Self {
            store,
            consumer,
            primary: DocumentKey::user(settings.primary_document.clone()),
            namespace: settings.reserved_namespace.clone(),
            debounce: settings.debounce(),
        }
    }

    /// Process one change event for `key`.
    pub fn handle_change(&self, key: &DocumentKey) -> ReconcileOutcome {
        let evicted = self.store.evict(key);
        metrics::record_reload(&key.to_string());
        info!(document = %key, evicted, "Configuration file changed");

        if *key != self.primary {
            return ReconcileOutcome::default();
        }

        let (previous, current) = match self.store.reload_and_advance(key) {
            Ok(Reload::Advanced { previous, current }) => (previous, current),
            Ok(Reload::Baseline(_)) => {
                debug!(document = %key, "First load recorded as baseline");
                return ReconcileOutcome::default();
            }
            Err(err) => {
                error!(document = %key, error = %err, "Reload failed, keeping previous baseline");
                return ReconcileOutcome::default();
            }
        };

        let entries = engine::diff(&previous, &current);
        let actions = derive_actions(&entries, &previous, &current, &self.namespace);
        debug!(
            document = %key,
            entries = entries.len(),
            actions = actions.len(),
            "Configuration diff computed"
        );

        for action in &actions {
            self.dispatch(action);
        }

        ReconcileOutcome { entries, actions }
    }

    fn dispatch(&self, action: &Action) {
        match self.consumer.apply_action(action) {
            Ok(()) => {
                metrics::record_action(action.kind.as_str());
                info!(kind = %action.kind, server = %action.server, "Action dispatched");
            }
            Err(err) => {
                metrics::record_dispatch_failure();
                warn!(kind = %action.kind, server = %action.server, error = %err, "Action dispatch failed");
            }
        }
    }

    /// Drain change events until the channel closes or shutdown fires.
    pub async fn run(
        self,
        mut changes: mpsc::UnboundedReceiver<DocumentKey>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        info!(primary = %self.primary, namespace = %self.namespace, "Reconciler starting");

        loop {
            tokio::select! {
                event = changes.recv() => match event {
                    Some(key) => {
                        for key in self.settle(key, &mut changes).await {
                            self.handle_change(&key);
                        }
                    }
                    None => {
                        info!("Change source closed, reconciler exiting");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    info!("Reconciler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Gather the burst of events that follows `first` until the channel has
    /// been quiet for the debounce window. Keys come back deduplicated in
    /// first-seen order.
    ///
    /// Editors that truncate before writing fire several events per save;
    /// reloading after the burst reads the finished file once.
    async fn settle(&self, first: DocumentKey, changes: &mut mpsc::UnboundedReceiver<DocumentKey>) -> Vec<DocumentKey> {
        let mut pending = vec![first];
        if self.debounce.is_zero() {
            return pending;
        }

        let deadline = Instant::now() + self.debounce * MAX_SETTLE_WINDOWS;
        loop {
            let quiet_until = (Instant::now() + self.debounce).min(deadline);
            match tokio::time::timeout_at(quiet_until, changes.recv()).await {
                Ok(Some(key)) => {
                    if !pending.contains(&key) {
                        pending.push(key);
                    }
                }
                Ok(None) | Err(_) => break,
            }
        }

        trace!(documents = pending.len(), "Change burst settled");
        pending
    }
}

/// Classify the namespace entries of a diff into actions.
///
/// An entry at exactly `namespace` (the whole block appeared, vanished or
/// changed shape) is first expanded into one entry per server.
pub fn derive_actions(entries: &[DiffEntry], previous: &ConfigTree, current: &ConfigTree, namespace: &str) -> Vec<Action> {
    let mut actions = Vec::new();

    for entry in entries {
        if entry.keys.first().map(String::as_str) != Some(namespace) {
            continue;
        }

        if entry.keys.len() == 1 {
            let empty = Mapping::new();
            let old = entry.old_value.as_ref().and_then(Value::as_mapping).unwrap_or(&empty);
            let new = entry.new_value.as_ref().and_then(Value::as_mapping).unwrap_or(&empty);
            let mut expanded = Vec::new();
            diff_mappings(old, new, &entry.keys, &mut expanded);
            actions.extend(
                expanded
                    .iter()
                    .filter_map(|e| action_for(e, previous, current)),
            );
        } else if let Some(action) = action_for(entry, previous, current) {
            actions.push(action);
        }
    }

    actions
}

fn action_for(entry: &DiffEntry, previous: &ConfigTree, current: &ConfigTree) -> Option<Action> {
    let kind = ActionKind::classify(entry)?;
    let server_keys = entry.keys.get(..2)?;
    let target = current
        .get_in(server_keys)
        .or_else(|| previous.get_in(server_keys))?
        .clone();

    Some(Action {
        kind,
        server: server_keys[1].clone(),
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeCodec;

    fn tree(text: &str) -> ConfigTree {
        TreeCodec::parse(text).unwrap()
    }

    fn actions(old: &str, new: &str) -> Vec<Action> {
        let (old, new) = (tree(old), tree(new));
        derive_actions(&engine::diff(&old, &new), &old, &new, "servers")
    }

    #[test]
    fn test_added_server() {
        let found = actions(
            "servers:\n  other:\n    port: 1\n",
            "servers:\n  other:\n    port: 1\n  myhost:\n    port: 8080\n",
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, ActionKind::Add);
        assert_eq!(found[0].server, "myhost");
        assert_eq!(found[0].target, Value::Mapping(tree("port: 8080\n").into_mapping()));
    }

    #[test]
    fn test_removed_server_targets_old_tree() {
        let found = actions(
            "servers:\n  myhost:\n    port: 8080\n  other:\n    port: 1\n",
            "servers:\n  other:\n    port: 1\n",
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, ActionKind::Remove);
        assert_eq!(found[0].target, Value::Mapping(tree("port: 8080\n").into_mapping()));
    }

    #[test]
    fn test_enabled_flag_naming() {
        let base = "servers:\n  myhost:\n    port: 8080\n";
        let disabled = actions(base, "servers:\n  myhost:\n    port: 8080\n    enabled: true\n");
        assert_eq!(disabled[0].kind, ActionKind::Disable);

        let enabled = actions(
            "servers:\n  myhost:\n    enabled: true\n",
            "servers:\n  myhost:\n    enabled: false\n",
        );
        assert_eq!(enabled[0].kind, ActionKind::Enable);
        assert_eq!(enabled[0].target, Value::Mapping(tree("enabled: false\n").into_mapping()));
    }

    #[test]
    fn test_whole_namespace_is_expanded() {
        let added = actions(
            "webname: Bot\n",
            "webname: Bot\nservers:\n  a:\n    port: 1\n  b:\n    port: 2\n",
        );
        let servers: Vec<_> = added.iter().map(|a| (a.kind, a.server.as_str())).collect();
        assert_eq!(servers, vec![(ActionKind::Add, "a"), (ActionKind::Add, "b")]);

        let removed = actions("servers:\n  a:\n    port: 1\n", "webname: Bot\n");
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].kind, ActionKind::Remove);
    }

    #[test]
    fn test_other_keys_ignored() {
        assert!(actions("webname: Bot\nport: 1\n", "webname: Other\nport: 2\n").is_empty());
        assert!(actions(
            "servers:\n  myhost:\n    port: 1\n",
            "servers:\n  myhost:\n    port: 2\n"
        )
        .is_empty());
    }

    #[test]
    fn test_dotted_server_name_resolves() {
        let found = actions(
            "servers: {}\n",
            "servers:\n  bot.example.com:\n    port: 8080\n",
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, ActionKind::Add);
        assert_eq!(found[0].server, "bot.example.com");
        assert_eq!(found[0].target, Value::Mapping(tree("port: 8080\n").into_mapping()));

        let flagged = actions(
            "servers:\n  10.0.0.1:\n    port: 1\n",
            "servers:\n  10.0.0.1:\n    port: 1\n    enabled: true\n",
        );
        assert_eq!(flagged[0].kind, ActionKind::Disable);
        assert_eq!(flagged[0].server, "10.0.0.1");
    }

    fn reconciler_with_debounce(debounce_ms: u64) -> (tempfile::TempDir, Reconciler) {
        use crate::store::{Registry, StoreLayout};
        use crate::watch::{LoggingActionConsumer, ManualChangeSource};

        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(
            StoreLayout::new(dir.path()),
            Arc::new(Registry::new()),
            Arc::new(ManualChangeSource::new()),
        );
        let settings = ReconcilerSettings {
            debounce_ms,
            ..ReconcilerSettings::default()
        };
        let reconciler = Reconciler::new(Arc::new(store), Arc::new(LoggingActionConsumer), &settings);
        (dir, reconciler)
    }

    #[tokio::test]
    async fn test_burst_of_events_settles_to_unique_keys() {
        let (_dir, reconciler) = reconciler_with_debounce(50);
        let (tx, mut rx) = mpsc::unbounded_channel();
        for name in ["config", "smtp", "config", "config"] {
            tx.send(DocumentKey::user(name)).unwrap();
        }

        let settled = reconciler.settle(DocumentKey::user("config"), &mut rx).await;
        assert_eq!(settled, vec![DocumentKey::user("config"), DocumentKey::user("smtp")]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_zero_debounce_returns_immediately() {
        let (_dir, reconciler) = reconciler_with_debounce(0);
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(DocumentKey::user("smtp")).unwrap();

        let settled = reconciler.settle(DocumentKey::user("config"), &mut rx).await;
        assert_eq!(settled, vec![DocumentKey::user("config")]);
        assert_eq!(rx.try_recv().unwrap(), DocumentKey::user("smtp"));
    }
}
