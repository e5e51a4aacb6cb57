//! Settings validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject names that cannot address a document or a namespace
//! - Reject a layout where defaults and user documents share a directory
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineSettings → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::settings::schema::EngineSettings;

/// A single semantic problem in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("reconciler.reserved_namespace '{0}' must be a single key (no '.')")]
    DottedNamespace(String),

    #[error("storage.default_dir and storage.user_dir are both '{0}'")]
    SharedDirectory(String),

    #[error("reconciler.poll_interval_secs must be greater than zero")]
    ZeroPollInterval,
}

/// Check settings for semantic errors.
pub fn validate_settings(settings: &EngineSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let storage = &settings.storage;
    let reconciler = &settings.reconciler;

    let required = [
        ("storage.default_dir", storage.default_dir.as_str()),
        ("storage.user_dir", storage.user_dir.as_str()),
        ("storage.extension", storage.extension.as_str()),
        ("reconciler.primary_document", reconciler.primary_document.as_str()),
        ("reconciler.reserved_namespace", reconciler.reserved_namespace.as_str()),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            errors.push(ValidationError::Empty { field });
        }
    }

    if reconciler.reserved_namespace.contains('.') {
        errors.push(ValidationError::DottedNamespace(
            reconciler.reserved_namespace.clone(),
        ));
    }

    if !storage.default_dir.is_empty() && storage.default_dir == storage.user_dir {
        errors.push(ValidationError::SharedDirectory(storage.default_dir.clone()));
    }

    if reconciler.poll_interval_secs == 0 {
        errors.push(ValidationError::ZeroPollInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_settings(&EngineSettings::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut settings = EngineSettings::default();
        settings.storage.user_dir = settings.storage.default_dir.clone();
        settings.storage.extension = String::new();
        settings.reconciler.reserved_namespace = "servers.ws".to_string();
        settings.reconciler.poll_interval_secs = 0;

        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Empty { field: "storage.extension" }));
        assert!(errors.contains(&ValidationError::ZeroPollInterval));
        assert!(errors.contains(&ValidationError::DottedNamespace("servers.ws".to_string())));
    }
}
