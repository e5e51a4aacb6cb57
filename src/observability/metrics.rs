//! Metrics collection.
//!
//! # Metrics
//! - `reconciler_documents_loaded_total` (counter): parses by document kind
//! - `reconciler_parse_failures_total` (counter): malformed documents by kind
//! - `reconciler_reloads_total` (counter): change events handled by document
//! - `reconciler_actions_total` (counter): dispatched actions by kind
//! - `reconciler_dispatch_failures_total` (counter): rejected actions
//! - `reconciler_defaults_merged_total` (counter): user documents rewritten at init
//!
//! Without an installed recorder these calls are no-ops.

pub fn record_document_loaded(kind: &str) {
    metrics::counter!("reconciler_documents_loaded_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_parse_failure(kind: &str) {
    metrics::counter!("reconciler_parse_failures_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_reload(document: &str) {
    metrics::counter!("reconciler_reloads_total", "document" => document.to_string()).increment(1);
}

pub fn record_action(kind: &str) {
    metrics::counter!("reconciler_actions_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_dispatch_failure() {
    metrics::counter!("reconciler_dispatch_failures_total").increment(1);
}

pub fn record_defaults_merged(document: &str) {
    metrics::counter!("reconciler_defaults_merged_total", "document" => document.to_string())
        .increment(1);
}
