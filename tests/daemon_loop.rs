//! The reconciler task driven by real file system events.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use config_reconciler::lifecycle::{bootstrap, Shutdown};
use config_reconciler::settings::EngineSettings;
use config_reconciler::store::{DocumentKey, LoggingSettingHook};
use config_reconciler::watch::{ActionKind, ChannelActionConsumer};

fn settings_for(root: &std::path::Path) -> EngineSettings {
    let mut settings = EngineSettings::default();
    settings.storage.root = root.to_path_buf();
    settings.reconciler.poll_interval_secs = 1;
    settings
}

#[tokio::test]
async fn test_edit_reaches_consumer_and_shutdown_stops_loop() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_for(dir.path());
    let defaults = dir.path().join("default_config");
    fs::create_dir_all(&defaults).unwrap();
    fs::write(defaults.join("config.yaml"), "webname: Bot\n").unwrap();

    let (consumer, mut actions) = ChannelActionConsumer::new();
    let engine = bootstrap(&settings, Arc::new(consumer), Arc::new(LoggingSettingHook)).unwrap();
    assert_eq!(engine.summary.created, vec!["config"]);
    assert!(engine.store.is_watching(&DocumentKey::user("config")));

    let shutdown = Shutdown::new();
    let task = tokio::spawn(engine.reconciler.run(engine.changes, shutdown.subscribe()));

    let user_doc = dir.path().join("config").join("config.yaml");
    fs::write(&user_doc, "webname: Bot\nservers:\n  myhost:\n    port: 8080\n").unwrap();

    let action = tokio::time::timeout(Duration::from_secs(10), actions.recv())
        .await
        .expect("no action within timeout")
        .expect("consumer channel closed");
    assert_eq!(action.kind, ActionKind::Add);
    assert_eq!(action.server, "myhost");

    // Save by rename, the way most editors do.
    let staging = dir.path().join("config").join("config.yaml.tmp");
    fs::write(&staging, "webname: Bot\nservers:\n  myhost:\n    port: 8080\n    enabled: true\n").unwrap();
    fs::rename(&staging, &user_doc).unwrap();

    let action = tokio::time::timeout(Duration::from_secs(10), actions.recv())
        .await
        .expect("no action after rename save")
        .expect("consumer channel closed");
    assert_eq!(action.kind, ActionKind::Disable);
    assert_eq!(action.server, "myhost");

    assert_eq!(shutdown.trigger(), 1);
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("reconciler did not stop")
        .unwrap();
}

#[test]
fn test_bootstrap_fails_without_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_for(&dir.path().join("absent"));
    let (consumer, _actions) = ChannelActionConsumer::new();

    let err = bootstrap(&settings, Arc::new(consumer), Arc::new(LoggingSettingHook))
        .err()
        .expect("bootstrap should fail");
    assert!(err.is_not_found());
}
