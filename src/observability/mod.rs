//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! store / reconciler produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Any `metrics` recorder the host installs
//! ```

pub mod logging;
pub mod metrics;
