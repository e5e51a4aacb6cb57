//! Layered configuration store with change reconciliation.
//!
//! # Architecture Overview
//!
//! ```text
//!   default_config/*.yaml ──┐
//!                           ▼
//!                   ┌──────────────┐   merge    ┌───────────────┐
//!                   │    store     │──────────▶│ config/*.yaml │
//!                   │ (registry +  │◀──────────│  (user docs)   │
//!                   │  line edits) │   get/set  └───────┬───────┘
//!                   └──────┬───────┘                    │ modify
//!                          │ baseline                   ▼
//!                   ┌──────▼───────┐  events   ┌───────────────┐
//!                   │  reconciler  │◀──────────│ notify source │
//!                   │ diff+classify│           └───────────────┘
//!                   └──────┬───────┘
//!                          ▼
//!                   ActionConsumer (add / remove / enable / disable)
//! ```
//!
//! Cross-cutting: `settings` (TOML), `observability` (tracing + metrics),
//! `lifecycle` (bootstrap, signals, shutdown).

// Core model
pub mod engine;
pub mod error;
pub mod tree;

// Storage and change tracking
pub mod store;
pub mod watch;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod settings;

pub use error::{ConfigError, ConfigResult};
pub use lifecycle::Shutdown;
pub use settings::EngineSettings;
pub use store::{ConfigStore, DocumentKey, DocumentKind};
pub use tree::{ConfigTree, Value};
pub use watch::{Action, ActionConsumer, ActionKind, Reconciler};
