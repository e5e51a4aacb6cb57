//! Configuration reconciler daemon.
//!
//! Materializes user documents from the shipped defaults, then watches them
//! and turns edits of the primary document's server block into actions
//! until SIGINT or SIGTERM.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use config_reconciler::lifecycle::{bootstrap, signals, Shutdown};
use config_reconciler::observability::logging;
use config_reconciler::settings::load_settings_or_default;
use config_reconciler::store::LoggingSettingHook;
use config_reconciler::watch::LoggingActionConsumer;

#[derive(Parser)]
#[command(name = "config-reconciler")]
#[command(about = "Keeps user configuration in line with defaults and reacts to edits", long_about = None)]
struct Args {
    /// Engine settings file (TOML). Missing means built-in defaults.
    #[arg(short, long, default_value = "reconciler.toml")]
    settings: PathBuf,

    /// Override the configuration root directory.
    #[arg(long)]
    root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut settings = load_settings_or_default(&args.settings)?;
    if let Some(root) = args.root {
        settings.storage.root = root;
    }

    logging::init(&settings.observability)?;
    tracing::info!("config-reconciler v{} starting", env!("CARGO_PKG_VERSION"));

    let engine = bootstrap(
        &settings,
        Arc::new(LoggingActionConsumer),
        Arc::new(LoggingSettingHook),
    )?;

    tracing::info!(
        created = engine.summary.created.len(),
        merged = engine.summary.merged.len(),
        skipped = engine.summary.skipped.len(),
        documents = engine.store.registry().document_count(),
        watching = engine.store.registry().watched_count(),
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    let reconciler = tokio::spawn(engine.reconciler.run(engine.changes, shutdown.subscribe()));

    signals::wait_for_termination().await;
    let listeners = shutdown.trigger();
    tracing::info!(listeners, "Shutdown signal received");

    if let Err(e) = reconciler.await {
        tracing::error!(error = %e, "Reconciler task failed");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
