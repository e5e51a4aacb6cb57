//! Store behavior against a temporary backing directory.

mod common;

use common::{yaml, Fixture};
use config_reconciler::error::ConfigError;
use config_reconciler::store::{ArrayEdit, DocumentKey, DocumentKind};
use config_reconciler::tree::Value;

#[test]
fn test_initialize_copies_missing_user_document_verbatim() {
    let default_text = "# shipped defaults\nwebname: Bot   # display name\nport: 8080\n";
    let fixture = Fixture::new().with_default("config", default_text);

    let summary = fixture.store.initialize().unwrap();

    assert_eq!(summary.created, vec!["config"]);
    assert_eq!(fixture.read_user("config"), default_text);
    assert!(fixture.hook.calls().is_empty());
    assert_eq!(fixture.source.watched(), vec![DocumentKey::user("config")]);
}

#[test]
fn test_initialize_leaves_complete_user_document_alone() {
    let user_text = "# mine\nwebname: Mine\nport: 9090\nextra: true\n";
    let fixture = Fixture::new()
        .with_default("config", "webname: Bot\nport: 8080\n")
        .with_user("config", user_text);

    let summary = fixture.store.initialize().unwrap();

    assert_eq!(summary.unchanged, vec!["config"]);
    assert_eq!(fixture.read_user("config"), user_text);
}

#[test]
fn test_initialize_merges_nested_defaults() {
    let fixture = Fixture::new()
        .with_default("config", "smtp:\n  host: localhost\n  port: 25\nadmins:\n  - root\n")
        .with_user("config", "smtp:\n  host: mail.example.com\nadmins:\n  - alice\n");

    let summary = fixture.store.initialize().unwrap();

    assert_eq!(summary.merged, vec!["config"]);
    let tree = fixture.store.get(DocumentKind::User, "config").unwrap();
    assert_eq!(tree.get("smtp.host"), Some(&Value::from("mail.example.com")));
    assert_eq!(tree.get("smtp.port"), Some(&Value::from(25)));
    assert_eq!(tree.get("admins"), Some(&Value::from(vec![Value::from("alice")])));

    let paths: Vec<_> = fixture.hook.calls().into_iter().map(|(_, path, _)| path).collect();
    assert_eq!(paths, vec!["smtp.port"]);
}

#[test]
fn test_initialize_skips_malformed_user_document() {
    let broken = "webname: [unclosed\n";
    let fixture = Fixture::new()
        .with_default("config", "webname: Bot\n")
        .with_default("smtp", "host: localhost\n")
        .with_user("config", broken);

    let summary = fixture.store.initialize().unwrap();

    assert_eq!(summary.skipped, vec!["config"]);
    assert_eq!(summary.created, vec!["smtp"]);
    assert_eq!(fixture.read_user("config"), broken);
    assert!(matches!(
        fixture.store.get(DocumentKind::User, "config"),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn test_initialize_fails_on_malformed_default() {
    let fixture = Fixture::new().with_default("config", "webname: [unclosed\n");
    assert!(matches!(
        fixture.store.initialize(),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn test_initialize_creates_user_directory() {
    let fixture = Fixture::new().with_default("config", "webname: Bot\n");
    let user_dir = fixture.layout.dir(DocumentKind::User);
    assert!(!user_dir.exists());

    fixture.store.initialize().unwrap();
    assert!(user_dir.is_dir());
}

#[test]
fn test_set_creates_missing_parents_and_keeps_comments() {
    let fixture = Fixture::new().with_user("config", "# top\nwebname: Bot # name\n");

    fixture.store.set("config", "servers.myhost.port", 8080).unwrap();

    let text = fixture.read_user("config");
    assert!(text.starts_with("# top\nwebname: Bot # name\n"));
    let tree = fixture.store.get(DocumentKind::User, "config").unwrap();
    assert_eq!(tree.get("servers.myhost.port"), Some(&Value::from(8080)));
}

#[test]
fn test_set_creates_missing_document() {
    let fixture = Fixture::new();
    fixture.store.set("fresh", "enabled", true).unwrap();
    assert_eq!(
        fixture.store.get_value(DocumentKind::User, "fresh", "enabled").unwrap(),
        Some(Value::Bool(true))
    );
}

#[test]
fn test_set_non_scalar_rewrites_document() {
    let fixture = Fixture::new().with_user("config", "webname: Bot\n");

    fixture
        .store
        .set("config", "admins", vec![Value::from("alice"), Value::from("bob")])
        .unwrap();

    let tree = fixture.store.get(DocumentKind::User, "config").unwrap();
    assert_eq!(tree.get("webname"), Some(&Value::from("Bot")));
    assert_eq!(
        tree.get("admins"),
        Some(&Value::from(vec![Value::from("alice"), Value::from("bob")]))
    );
}

#[test]
fn test_set_rejects_malformed_document() {
    let fixture = Fixture::new().with_user("config", "webname: [unclosed\n");
    assert!(matches!(
        fixture.store.set("config", "webname", "Bot"),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn test_array_entries() {
    let fixture = Fixture::new().with_user("config", "admins:\n  - alice\n");
    let store = &fixture.store;

    assert!(store
        .append_or_remove_array_entry("config", "admins", "bob", ArrayEdit::Append)
        .unwrap());
    assert!(store
        .append_or_remove_array_entry("config", "admins", "alice", ArrayEdit::Remove)
        .unwrap());
    assert!(!store
        .append_or_remove_array_entry("config", "admins", "carol", ArrayEdit::Remove)
        .unwrap());
    assert!(!store
        .append_or_remove_array_entry("config", "missing", "carol", ArrayEdit::Remove)
        .unwrap());
    assert!(store
        .append_or_remove_array_entry("config", "owners", "dave", ArrayEdit::Append)
        .unwrap());

    let tree = store.get(DocumentKind::User, "config").unwrap();
    assert_eq!(tree.get("admins"), Some(&Value::from(vec![Value::from("bob")])));
    assert_eq!(tree.get("owners"), Some(&Value::from(vec![Value::from("dave")])));
}

#[test]
fn test_array_operations_on_scalar_fail() {
    let fixture = Fixture::new().with_user("config", "webname: Bot\n");

    assert!(matches!(
        fixture
            .store
            .append_or_remove_array_entry("config", "webname", "x", ArrayEdit::Append),
        Err(ConfigError::NotASequence { .. })
    ));
    assert!(matches!(
        fixture.store.set_array_slot("config", "absent", 0, "x"),
        Err(ConfigError::MissingKey { .. })
    ));
}

#[test]
fn test_remove_server_from_sequence() {
    let fixture = Fixture::new().with_user(
        "ws-config",
        "servers:\n  - name: alpha\n    url: ws://a\n  - name: beta\n    url: ws://b\n",
    );

    fixture.store.remove_server_entry_by_name("ws-config", "alpha").unwrap();

    let servers = fixture
        .store
        .get_value(DocumentKind::User, "ws-config", "servers")
        .unwrap();
    assert_eq!(
        servers,
        Some(Value::from(vec![yaml("name: beta\nurl: ws://b\n")]))
    );
}

#[test]
fn test_remove_unknown_server_is_missing_key() {
    let fixture = Fixture::new().with_user("config", "servers:\n  alpha:\n    port: 1\n");

    let err = fixture
        .store
        .remove_server_entry_by_name("config", "gamma")
        .unwrap_err();
    match err {
        ConfigError::MissingKey { path, .. } => assert_eq!(path, "servers.gamma"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_value_or_reads_line_from_malformed_document() {
    let fixture = Fixture::new().with_user("config", "webname: Bot\nadmins: [unclosed\n");
    let store = &fixture.store;

    assert_eq!(
        store.value_or(DocumentKind::User, "config", "webname", "fallback"),
        Value::from("Bot")
    );
    assert_eq!(
        store.value_or(DocumentKind::User, "config", "admins", "fallback"),
        Value::from("fallback")
    );
    assert_eq!(
        store.value_or(DocumentKind::Default, "config", "webname", "fallback"),
        Value::from("fallback")
    );
}

#[test]
fn test_get_reads_default_documents() {
    let fixture = Fixture::new().with_default("config", "webname: Bot\n");
    assert_eq!(
        fixture.store.get_value(DocumentKind::Default, "config", "webname").unwrap(),
        Some(Value::from("Bot"))
    );
    assert!(fixture.store.is_watching(&DocumentKey::default_doc("config")));
}
