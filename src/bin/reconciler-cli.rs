use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use config_reconciler::engine;
use config_reconciler::settings::{load_settings_or_default, EngineSettings};
use config_reconciler::store::{ArrayEdit, ConfigStore, DocumentKind, Registry, StoreLayout};
use config_reconciler::tree::{ConfigTree, TreeCodec, Value};
use config_reconciler::watch::{derive_actions, ManualChangeSource};

#[derive(Parser)]
#[command(name = "reconciler-cli")]
#[command(about = "Inspect and edit layered configuration documents", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "reconciler.toml")]
    settings: PathBuf,

    /// Override the configuration root directory.
    #[arg(long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or merge user documents from the shipped defaults
    Init,
    /// Print a document, or one value of it
    Get {
        name: String,
        path: Option<String>,
        #[arg(long, default_value = "user")]
        kind: DocumentKind,
    },
    /// Write one value into a user document
    Set { name: String, path: String, value: String },
    /// Replace (or append at the end of) one sequence element
    SetSlot {
        name: String,
        path: String,
        index: usize,
        value: String,
    },
    /// Append a value to a sequence
    Append { name: String, path: String, value: String },
    /// Remove the first equal value from a sequence
    Remove { name: String, path: String, value: String },
    /// Remove a server entry by name
    RemoveServer {
        server: String,
        /// Document holding the server list (defaults to the configured one).
        #[arg(long)]
        document: Option<String>,
    },
    /// Diff two document files and derive the resulting actions
    Diff { old: PathBuf, new: PathBuf },
    /// Merge a user file over a defaults file
    Merge { user: PathBuf, defaults: PathBuf },
}

#[derive(Serialize)]
struct DiffReport {
    entries: Vec<engine::DiffEntry>,
    actions: Vec<config_reconciler::Action>,
}

#[derive(Serialize)]
struct MergeReport {
    changed: bool,
    merged: Value,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut settings = load_settings_or_default(&cli.settings)?;
    if let Some(root) = cli.root {
        settings.storage.root = root;
    }

    match cli.command {
        Commands::Init => {
            let summary = open_store(&settings).initialize()?;
            print_json(&summary)?;
        }
        Commands::Get { name, path, kind } => {
            let store = open_store(&settings);
            match path {
                Some(path) => print_json(&store.get_value(kind, &name, &path)?)?,
                None => print_json(&Value::from(store.get(kind, &name)?))?,
            }
        }
        Commands::Set { name, path, value } => {
            open_store(&settings).set(&name, &path, Value::parse_scalar(&value))?;
            print_json(&serde_json::json!({ "updated": path }))?;
        }
        Commands::SetSlot {
            name,
            path,
            index,
            value,
        } => {
            open_store(&settings).set_array_slot(&name, &path, index, Value::parse_scalar(&value))?;
            print_json(&serde_json::json!({ "updated": path, "index": index }))?;
        }
        Commands::Append { name, path, value } => {
            let changed = open_store(&settings).append_or_remove_array_entry(
                &name,
                &path,
                Value::parse_scalar(&value),
                ArrayEdit::Append,
            )?;
            print_json(&serde_json::json!({ "changed": changed }))?;
        }
        Commands::Remove { name, path, value } => {
            let changed = open_store(&settings).append_or_remove_array_entry(
                &name,
                &path,
                Value::parse_scalar(&value),
                ArrayEdit::Remove,
            )?;
            print_json(&serde_json::json!({ "changed": changed }))?;
        }
        Commands::RemoveServer { server, document } => {
            let document = document.unwrap_or_else(|| settings.reconciler.server_list_document.clone());
            open_store(&settings).remove_server_entry_by_name(&document, &server)?;
            print_json(&serde_json::json!({ "removed": server, "document": document }))?;
        }
        Commands::Diff { old, new } => {
            let (old, new) = (read_tree(&old)?, read_tree(&new)?);
            let entries = engine::diff(&old, &new);
            let actions = derive_actions(&entries, &old, &new, &settings.reconciler.reserved_namespace);
            print_json(&DiffReport { entries, actions })?;
        }
        Commands::Merge { user, defaults } => {
            let outcome = engine::merge(&read_tree(&user)?, &read_tree(&defaults)?);
            print_json(&MergeReport {
                changed: outcome.changed,
                merged: Value::from(outcome.merged),
            })?;
        }
    }

    Ok(())
}

fn open_store(settings: &EngineSettings) -> ConfigStore {
    ConfigStore::new(
        StoreLayout::from_settings(&settings.storage),
        Arc::new(Registry::new()),
        Arc::new(ManualChangeSource::new()),
    )
    .with_server_key(settings.reconciler.reserved_namespace.clone())
}

fn read_tree(path: &Path) -> Result<ConfigTree, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(TreeCodec::parse(&text)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
