//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Settings → StoreLayout + Registry + NotifyChangeSource
//!     → ConfigStore::initialize → Reconciler
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → reconciler loop exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: a default document that cannot be read aborts startup
//! - Watchers are installed by `initialize`, before the reconciler runs, so
//!   no edit made after startup is missed

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{bootstrap, Engine};
