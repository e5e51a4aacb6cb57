//! Change detection and reconciliation.
//!
//! # Data Flow
//! ```text
//! file modified
//!     → source.rs (notify watcher → mpsc::UnboundedSender<DocumentKey>)
//!     → reconciler.rs (evict → reload + diff under lock → classify)
//!     → action.rs (ActionConsumer::apply_action per action)
//! ```
//!
//! # Design Decisions
//! - One reconciler task drains the channel, so events are handled in
//!   arrival order and the baseline advances once per event
//! - Dispatch failures are logged and never roll the baseline back

pub mod action;
pub mod reconciler;
pub mod source;

pub use action::{Action, ActionConsumer, ActionKind, ChannelActionConsumer, LoggingActionConsumer};
pub use reconciler::{derive_actions, ReconcileOutcome, Reconciler};
pub use source::{ChangeSource, ManualChangeSource, NotifyChangeSource, WatchHandle};
