//! Engine settings subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EngineSettings (validated, immutable)
//!     → handed to startup, which builds the store and reconciler
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once loaded; the engine never reloads them
//! - All fields have defaults to allow minimal or absent files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, load_settings_or_default, SettingsError};
pub use schema::{EngineSettings, ObservabilitySettings, ReconcilerSettings, StorageSettings};
