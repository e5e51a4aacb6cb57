//! Actions derived from server configuration edits.

use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;

use crate::engine::DiffEntry;
use crate::error::{ConfigError, ConfigResult};
use crate::tree::Value;

/// Kind of server action.
///
/// `Disable` is emitted when a flag becomes `true` and `Enable` when it
/// becomes `false`: consumers key on the flag meaning "disabled".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Add,
    Remove,
    Enable,
    Disable,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Add => "add",
            ActionKind::Remove => "remove",
            ActionKind::Enable => "enable",
            ActionKind::Disable => "disable",
        }
    }

    /// Classify one diff entry. First matching rule wins.
    ///
    /// | old            | new     | kind    |
    /// |----------------|---------|---------|
    /// | absent         | mapping | add     |
    /// | mapping        | absent  | remove  |
    /// | false / absent | true    | disable |
    /// | true / absent  | false   | enable  |
    pub fn classify(entry: &DiffEntry) -> Option<ActionKind> {
        match (&entry.old_value, &entry.new_value) {
            (None, Some(Value::Mapping(_))) => Some(ActionKind::Add),
            (Some(Value::Mapping(_)), None) => Some(ActionKind::Remove),
            (None | Some(Value::Bool(false)), Some(Value::Bool(true))) => Some(ActionKind::Disable),
            (None | Some(Value::Bool(true)), Some(Value::Bool(false))) => Some(ActionKind::Enable),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One server action handed to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub kind: ActionKind,
    /// Second path segment of the triggering entry.
    pub server: String,
    /// Full server mapping from the new tree, or the old one for removals.
    pub target: Value,
}

/// Receives actions derived from the primary document.
pub trait ActionConsumer: Send + Sync {
    fn apply_action(&self, action: &Action) -> ConfigResult<()>;
}

/// Consumer that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingActionConsumer;

impl ActionConsumer for LoggingActionConsumer {
    fn apply_action(&self, action: &Action) -> ConfigResult<()> {
        tracing::info!(
            kind = %action.kind,
            server = %action.server,
            target = %action.target,
            "Server action"
        );
        Ok(())
    }
}

/// Consumer that forwards actions to an async task.
#[derive(Debug, Clone)]
pub struct ChannelActionConsumer {
    tx: mpsc::UnboundedSender<Action>,
}

impl ChannelActionConsumer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Action>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ActionConsumer for ChannelActionConsumer {
    fn apply_action(&self, action: &Action) -> ConfigResult<()> {
        self.tx
            .send(action.clone())
            .map_err(|_| ConfigError::ActionDispatch("action receiver dropped".to_string()))
    }
}
