//! Settings loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::settings::schema::EngineSettings;
use crate::settings::validation::{validate_settings, ValidationError};

/// Error type for settings loading.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<EngineSettings, SettingsError> {
    let content = fs::read_to_string(path)?;
    parse_settings(&content)
}

/// Load settings if the file exists, otherwise fall back to defaults.
pub fn load_settings_or_default(path: &Path) -> Result<EngineSettings, SettingsError> {
    if path.exists() {
        load_settings(path)
    } else {
        tracing::info!(path = %path.display(), "Settings file not found, using defaults");
        Ok(EngineSettings::default())
    }
}

/// Parse and validate settings text.
pub fn parse_settings(content: &str) -> Result<EngineSettings, SettingsError> {
    let settings: EngineSettings = toml::from_str(content)?;
    validate_settings(&settings).map_err(SettingsError::Validation)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = parse_settings(
            r#"
            [storage]
            root = "/srv/bot/config"

            [observability]
            json_logs = true
            "#,
        )
        .unwrap();
        assert_eq!(settings.storage.root, Path::new("/srv/bot/config"));
        assert_eq!(settings.storage.user_dir, "config");
        assert_eq!(settings.reconciler.reserved_namespace, "servers");
        assert!(settings.observability.json_logs);
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let err = parse_settings("[reconciler]\npoll_interval_secs = 0\n").unwrap_err();
        assert!(matches!(err, SettingsError::Validation(ref errors) if errors.len() == 1));

        let err = parse_settings("[storage\nroot = 1").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.reconciler.primary_document, "config");
    }
}
