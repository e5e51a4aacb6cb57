//! Callbacks the store fires when defaults are materialized.

use crate::tree::Value;

/// Receives every setting that `initialize` adds to a user document.
///
/// Calls are fire-and-forget and happen after the document was written and
/// the registry lock released, so implementations may read the store.
pub trait SettingHook: Send + Sync {
    fn apply_setting(&self, name: &str, path: &str, value: &Value);
}

/// Hook that only records the change in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSettingHook;

impl SettingHook for LoggingSettingHook {
    fn apply_setting(&self, name: &str, path: &str, value: &Value) {
        tracing::info!(document = %name, path = %path, value = %value, "Default setting materialized");
    }
}
